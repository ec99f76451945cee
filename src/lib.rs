//! Flick floating bubble
//!
//! A draggable always-on-top icon that:
//! - Follows the finger and snaps to the nearest side edge on release
//! - Opens its app on tap
//! - Removes itself when dropped on the bottom drop target
//! - Remembers where it rested (edge + height ratio) across restarts and rotation
//!
//! The window system is abstracted behind [`overlay::OverlayHost`], so the
//! engine itself is headless and driven by plain method calls.

pub mod config;
pub mod error;
pub mod image_source;
pub mod input;
pub mod notify;
pub mod overlay;
pub mod position;
pub mod primitives;

pub use config::{EngineSettings, OverlayConfig};
pub use error::{OverlayError, Result};
pub use overlay::{Command, EngineState, OverlayController, OverlayHost};
