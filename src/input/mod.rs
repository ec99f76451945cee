//! Input handling - raw touch events and drag gesture tracking
//!
//! This module provides:
//! - Raw touch events as delivered by the overlay host
//! - Drag tracking with tap/drag/drop classification

mod gestures;
mod touch;

pub use gestures::*;
pub use touch::*;
