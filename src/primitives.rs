//! Basic geometry and animation primitives for the bubble overlay
//!
//! Surfaces live in device pixels (`i32`), raw touch coordinates are `f64`.

use std::ops::{Add, Sub};
use std::time::Duration;

/// A point in screen space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point<T = i32> {
    pub x: T,
    pub y: T,
}

impl<T> From<(T, T)> for Point<T> {
    fn from((x, y): (T, T)) -> Self {
        Self { x, y }
    }
}

impl<T: Add<Output = T>> Add for Point<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Point::from((self.x + rhs.x, self.y + rhs.y))
    }
}

impl<T: Sub<Output = T>> Sub for Point<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Point::from((self.x - rhs.x, self.y - rhs.y))
    }
}

impl Eq for Point<i32> {}

/// Width and height in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

impl From<(i32, i32)> for Size {
    fn from((w, h): (i32, i32)) -> Self {
        Self { w, h }
    }
}

/// An axis-aligned rectangle in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.w, size.h)
    }

    pub fn origin(&self) -> Point {
        Point::from((self.x, self.y))
    }

    pub fn size(&self) -> Size {
        Size::from((self.width, self.height))
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Integer center, rounded towards the origin like a layout pass would
    pub fn center(&self) -> Point {
        Point::from((self.x + self.width / 2, self.y + self.height / 2))
    }

    /// Check if a point lies inside this rectangle, edges included
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Physical display description reported by the overlay host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    pub width: i32,
    pub height: i32,
    /// Pixels per density-independent pixel
    pub density: f32,
}

impl DisplayMetrics {
    pub fn new(width: i32, height: i32, density: f32) -> Self {
        Self { width, height, density }
    }

    pub fn size(&self) -> Size {
        Size::from((self.width, self.height))
    }

    /// Same display turned by 90 degrees
    pub fn rotated(&self) -> Self {
        Self::new(self.height, self.width, self.density)
    }

    /// Convert dp to pixels, truncating like the platform does
    pub fn dp_to_px(&self, dp: i32) -> i32 {
        (dp as f32 * self.density) as i32
    }
}

/// Easing curves used by overlay animations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    /// Quadratic deceleration - starts fast, slows down
    Decelerate,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Decelerate => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Linear interpolation
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Fixed-duration animated value, advanced by the owner's frame clock
#[derive(Debug, Clone)]
pub struct Tween {
    from: f64,
    to: f64,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl Tween {
    pub fn new(from: f64, to: f64, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            easing,
        }
    }

    /// Step the animation forward and return the new value
    pub fn advance(&mut self, dt: Duration) -> f64 {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.value()
    }

    pub fn value(&self) -> f64 {
        if self.is_finished() {
            return self.to;
        }
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        lerp(self.from, self.to, self.easing.apply(t))
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}
