//! Edge snapping after a drag

use std::time::Duration;

use crate::position::{RestingArea, ScreenEdge};
use crate::primitives::{Easing, Size, Tween};

/// Animates the bubble horizontally to the closest screen edge.
/// Only one snap runs at a time; a new snap replaces the old one.
#[derive(Debug, Clone)]
pub struct EdgeSnapper {
    duration: Duration,
    animation: Option<Tween>,
}

impl EdgeSnapper {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            animation: None,
        }
    }

    /// Edge chosen by comparing the bubble midpoint with the screen midpoint
    pub fn choose_edge(current_x: i32, icon_width: i32, screen_width: i32) -> ScreenEdge {
        if current_x + icon_width / 2 < screen_width / 2 {
            ScreenEdge::Left
        } else {
            ScreenEdge::Right
        }
    }

    pub fn target_x(current_x: i32, screen: Size, icon: Size, margin: i32) -> i32 {
        let edge = Self::choose_edge(current_x, icon.w, screen.w);
        RestingArea::new(screen, icon, margin).edge_x(edge)
    }

    /// Start snapping from `current_x` and return the resting X right away
    pub fn snap(&mut self, current_x: i32, screen: Size, icon: Size, margin: i32) -> i32 {
        let target = Self::target_x(current_x, screen, icon, margin);
        self.animation = if current_x == target {
            None
        } else {
            Some(Tween::new(
                current_x as f64,
                target as f64,
                self.duration,
                Easing::Decelerate,
            ))
        };
        target
    }

    pub fn cancel(&mut self) {
        self.animation = None;
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Advance the running snap, returning the X for this frame
    pub fn advance(&mut self, dt: Duration) -> Option<i32> {
        let animation = self.animation.as_mut()?;
        let x = animation.advance(dt).round() as i32;
        if animation.is_finished() {
            self.animation = None;
        }
        Some(x)
    }
}
