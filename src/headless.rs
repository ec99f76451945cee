//! Headless overlay host for the demo driver
//!
//! Keeps track of which surfaces exist and logs every operation instead of
//! drawing anything.

use std::collections::HashMap;

use tracing::{debug, info};

use flick_bubble::error::{OverlayError, Result};
use flick_bubble::image_source::IconImage;
use flick_bubble::overlay::{OverlayHost, SurfaceKind, SurfaceLayout};
use flick_bubble::primitives::DisplayMetrics;

pub struct HeadlessHost {
    pub display: DisplayMetrics,
    permitted: bool,
    surfaces: HashMap<SurfaceKind, SurfaceLayout>,
}

impl HeadlessHost {
    pub fn new(display: DisplayMetrics, permitted: bool) -> Self {
        Self {
            display,
            permitted,
            surfaces: HashMap::new(),
        }
    }
}

impl OverlayHost for HeadlessHost {
    fn can_draw_overlays(&self) -> bool {
        self.permitted
    }

    fn display(&self) -> DisplayMetrics {
        self.display
    }

    fn add_surface(&mut self, kind: SurfaceKind, layout: &SurfaceLayout) -> Result<()> {
        if self.surfaces.contains_key(&kind) {
            return Err(OverlayError::Surface {
                kind,
                reason: "already added".into(),
            });
        }
        info!(%kind, x = layout.position.x, y = layout.position.y, w = layout.size.w, h = layout.size.h, "Surface added");
        self.surfaces.insert(kind, *layout);
        Ok(())
    }

    fn update_surface(&mut self, kind: SurfaceKind, layout: &SurfaceLayout) -> Result<()> {
        let surface = self
            .surfaces
            .get_mut(&kind)
            .ok_or(OverlayError::SurfaceMissing(kind))?;
        debug!(
            %kind,
            x = layout.position.x,
            y = layout.position.y,
            w = layout.size.w,
            alpha = layout.alpha,
            scale = layout.scale,
            activated = layout.activated,
            "Surface updated"
        );
        *surface = *layout;
        Ok(())
    }

    fn remove_surface(&mut self, kind: SurfaceKind) -> Result<()> {
        self.surfaces
            .remove(&kind)
            .ok_or(OverlayError::SurfaceMissing(kind))?;
        info!(%kind, "Surface removed");
        Ok(())
    }

    fn set_surface_image(&mut self, kind: SurfaceKind, image: Option<&IconImage>) -> Result<()> {
        match image {
            Some(image) => info!(%kind, width = image.width, height = image.height, "Surface image set"),
            None => info!(%kind, "Surface image reset to default"),
        }
        Ok(())
    }

    fn bring_app_to_front(&mut self) {
        info!("Bringing app to front");
    }
}
