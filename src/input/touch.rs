//! Touch input handling

use crate::primitives::Point;

/// Raw single-pointer touch event on the bubble, in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Down {
        position: Point<f64>,
    },
    Motion {
        position: Point<f64>,
    },
    Up {
        position: Point<f64>,
    },
    Cancel,
}

impl TouchEvent {
    pub fn down(x: f64, y: f64) -> Self {
        TouchEvent::Down { position: Point::from((x, y)) }
    }

    pub fn motion(x: f64, y: f64) -> Self {
        TouchEvent::Motion { position: Point::from((x, y)) }
    }

    pub fn up(x: f64, y: f64) -> Self {
        TouchEvent::Up { position: Point::from((x, y)) }
    }
}
