//! Overlay host seam and surface descriptions

use std::fmt;

use crate::error::Result;
use crate::image_source::IconImage;
use crate::primitives::{DisplayMetrics, Point, Size};

/// The two always-on-top surfaces the engine manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Bubble,
    DropTarget,
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceKind::Bubble => write!(f, "bubble"),
            SurfaceKind::DropTarget => write!(f, "drop target"),
        }
    }
}

/// Everything the host needs to place and draw a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceLayout {
    pub position: Point,
    pub size: Size,
    pub alpha: f32,
    /// Content scale around the center (hover pulse)
    pub scale: f32,
    pub touchable: bool,
    /// Drop target highlight while the bubble hovers over it
    pub activated: bool,
}

impl SurfaceLayout {
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            position,
            size,
            alpha: 1.0,
            scale: 1.0,
            touchable: true,
            activated: false,
        }
    }
}

/// Window system side of the overlay.
///
/// Every surface operation may fail, e.g. when overlay permission is revoked
/// mid-session or the surface was already torn down. The engine logs and
/// absorbs those failures.
pub trait OverlayHost {
    /// Whether the app may draw over other apps
    fn can_draw_overlays(&self) -> bool;

    /// Current display size and density
    fn display(&self) -> DisplayMetrics;

    fn add_surface(&mut self, kind: SurfaceKind, layout: &SurfaceLayout) -> Result<()>;

    fn update_surface(&mut self, kind: SurfaceKind, layout: &SurfaceLayout) -> Result<()>;

    fn remove_surface(&mut self, kind: SurfaceKind) -> Result<()>;

    /// Replace the surface image, `None` restores the built-in default
    fn set_surface_image(&mut self, kind: SurfaceKind, image: Option<&IconImage>) -> Result<()>;

    /// Tap side effect: bring the owning app to the front
    fn bring_app_to_front(&mut self);
}
