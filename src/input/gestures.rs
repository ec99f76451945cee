//! Drag gesture recognition for the bubble
//!
//! A touch sequence on the bubble ends in exactly one of:
//! - Drop (released over the drop target)
//! - Tap (never travelled further than the click slop)
//! - Drag (anything else)

use crate::primitives::Point;

/// What a released touch sequence turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Released with the bubble center over the drop target
    Drop,
    /// Released without meaningful movement
    Tap,
    /// Released somewhere else after moving
    Drag,
}

/// Dropping wins over everything, then taps, then drags
pub fn classify_release(over_drop_target: bool, is_click: bool) -> ReleaseOutcome {
    if over_drop_target {
        ReleaseOutcome::Drop
    } else if is_click {
        ReleaseOutcome::Tap
    } else {
        ReleaseOutcome::Drag
    }
}

/// Per touch sequence drag state
#[derive(Debug, Clone)]
pub struct DragGesture {
    pub start_touch: Point<f64>,
    pub start_surface: Point,
    pub current_touch: Point<f64>,
    click_slop: f64,
    still_click: bool,
}

impl DragGesture {
    pub fn begin(touch: Point<f64>, surface: Point, click_slop: i32) -> Self {
        Self {
            start_touch: touch,
            start_surface: surface,
            current_touch: touch,
            click_slop: click_slop as f64,
            still_click: true,
        }
    }

    /// Track a new touch position. Leaving the slop box once turns the
    /// sequence into a drag for good.
    pub fn track(&mut self, touch: Point<f64>) {
        self.current_touch = touch;
        let d = self.delta();
        if d.x.abs() > self.click_slop || d.y.abs() > self.click_slop {
            self.still_click = false;
        }
    }

    /// Track a move and return where the surface should now sit
    pub fn update(&mut self, touch: Point<f64>) -> Point {
        self.track(touch);
        self.surface_position()
    }

    pub fn delta(&self) -> Point<f64> {
        self.current_touch - self.start_touch
    }

    /// Start position plus finger travel, unclamped
    pub fn surface_position(&self) -> Point {
        let d = self.delta();
        self.start_surface + Point::from((d.x as i32, d.y as i32))
    }

    pub fn is_click(&self) -> bool {
        self.still_click
    }
}
