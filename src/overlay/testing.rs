//! Recording overlay host for tests

use std::collections::HashMap;

use super::{OverlayHost, SurfaceKind, SurfaceLayout};
use crate::error::{OverlayError, Result};
use crate::image_source::{IconImage, ImageLoader};
use crate::primitives::DisplayMetrics;

#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    Add(SurfaceKind),
    Update(SurfaceKind),
    Remove(SurfaceKind),
    Image(SurfaceKind, bool),
    BringToFront,
}

pub struct RecordingHost {
    pub display: DisplayMetrics,
    pub permitted: bool,
    /// Every update fails, like a revoked permission
    pub fail_updates: bool,
    pub fail_adds: bool,
    pub surfaces: HashMap<SurfaceKind, SurfaceLayout>,
    pub ops: Vec<HostOp>,
}

impl RecordingHost {
    pub fn new(display: DisplayMetrics) -> Self {
        Self {
            display,
            permitted: true,
            fail_updates: false,
            fail_adds: false,
            surfaces: HashMap::new(),
            ops: Vec::new(),
        }
    }

    pub fn surface(&self, kind: SurfaceKind) -> Option<&SurfaceLayout> {
        self.surfaces.get(&kind)
    }

    pub fn count(&self, op: &HostOp) -> usize {
        self.ops.iter().filter(|o| *o == op).count()
    }

    fn failure(kind: SurfaceKind) -> OverlayError {
        OverlayError::Surface {
            kind,
            reason: "window token gone".into(),
        }
    }
}

impl OverlayHost for RecordingHost {
    fn can_draw_overlays(&self) -> bool {
        self.permitted
    }

    fn display(&self) -> DisplayMetrics {
        self.display
    }

    fn add_surface(&mut self, kind: SurfaceKind, layout: &SurfaceLayout) -> Result<()> {
        if self.fail_adds {
            return Err(Self::failure(kind));
        }
        self.ops.push(HostOp::Add(kind));
        self.surfaces.insert(kind, *layout);
        Ok(())
    }

    fn update_surface(&mut self, kind: SurfaceKind, layout: &SurfaceLayout) -> Result<()> {
        if self.fail_updates {
            return Err(Self::failure(kind));
        }
        let surface = self
            .surfaces
            .get_mut(&kind)
            .ok_or(OverlayError::SurfaceMissing(kind))?;
        *surface = *layout;
        self.ops.push(HostOp::Update(kind));
        Ok(())
    }

    fn remove_surface(&mut self, kind: SurfaceKind) -> Result<()> {
        self.surfaces
            .remove(&kind)
            .ok_or(OverlayError::SurfaceMissing(kind))?;
        self.ops.push(HostOp::Remove(kind));
        Ok(())
    }

    fn set_surface_image(&mut self, kind: SurfaceKind, image: Option<&IconImage>) -> Result<()> {
        self.ops.push(HostOp::Image(kind, image.is_some()));
        Ok(())
    }

    fn bring_app_to_front(&mut self) {
        self.ops.push(HostOp::BringToFront);
    }
}

/// Loader that returns a 1x1 pixel for any source except "missing"
pub struct StubLoader;

impl ImageLoader for StubLoader {
    fn load(&self, source: &str) -> Result<IconImage> {
        if source == "missing" {
            return Err(OverlayError::Image("no such file".into()));
        }
        Ok(IconImage {
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
        })
    }
}
