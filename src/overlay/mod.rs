//! Overlay interaction engine
//!
//! Owns the bubble and drop target surfaces:
//! - Lifecycle: inactive -> active <-> hidden -> inactive
//! - Touch: drag follows the finger, release is a drop, tap or drag
//! - Drag releases snap to the nearest edge and persist the resting spot
//! - Rotation re-derives the position from the saved edge + height ratio
//!
//! All mutation happens on the thread that owns the controller. Animations
//! are advanced with `tick`, driven by the owner's frame timer.

mod snap;
mod surface;
#[cfg(test)]
mod testing;

pub use hit_test::*;
pub use snap::*;
pub use surface::*;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{EngineSettings, OverlayConfig};
use crate::error::{OverlayError, Result};
use crate::image_source::{IconImage, ImageLoader};
use crate::input::{classify_release, DragGesture, ReleaseOutcome, TouchEvent};
use crate::notify::NotificationHub;
use crate::position::{PositionStore, RestingArea};
use crate::primitives::{DisplayMetrics, Easing, Point, Size, Tween};

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No surfaces exist
    Inactive,
    /// Bubble shown and touchable
    Active,
    /// Bubble exists but is 1x1, transparent and ignores touch
    Hidden,
}

/// Commands from the controlling layer
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(OverlayConfig),
    Reconfigure(OverlayConfig),
    ResetIcon,
    ResetDropTargetIcon,
    Hide,
    Show,
    Stop,
}

/// Size and touchability captured on hide, restored on show
#[derive(Debug, Clone, Copy, PartialEq)]
struct HiddenSnapshot {
    size: Size,
    touchable: bool,
}

#[derive(Debug)]
struct BubbleSurface {
    layout: SurfaceLayout,
    snapshot: Option<HiddenSnapshot>,
}

#[derive(Debug)]
struct DropTarget {
    layout: SurfaceLayout,
    hovering: bool,
    fade: Option<Tween>,
    pulse: Option<Tween>,
    /// Fading out, removed once the fade completes
    dismissing: bool,
}

pub struct OverlayController<H: OverlayHost> {
    host: H,
    settings: EngineSettings,
    config: OverlayConfig,
    store: PositionStore,
    loader: Box<dyn ImageLoader>,
    notifier: NotificationHub,
    state: EngineState,
    display: DisplayMetrics,
    bubble: Option<BubbleSurface>,
    drop_target: Option<DropTarget>,
    gesture: Option<DragGesture>,
    snapper: EdgeSnapper,
    icon_image: Option<IconImage>,
    drop_target_image: Option<IconImage>,
}

/// Log and absorb a failed host operation, reporting whether it went through
fn absorb(result: Result<()>, what: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("{} failed: {}", what, e);
            false
        }
    }
}

impl<H: OverlayHost> OverlayController<H> {
    pub fn new(
        host: H,
        settings: EngineSettings,
        store: PositionStore,
        loader: impl ImageLoader + 'static,
    ) -> Self {
        let display = host.display();
        let snapper = EdgeSnapper::new(settings.snap_duration());
        Self {
            host,
            settings,
            config: OverlayConfig::default(),
            store,
            loader: Box::new(loader),
            notifier: NotificationHub::new(),
            state: EngineState::Inactive,
            display,
            bubble: None,
            drop_target: None,
            gesture: None,
            snapper,
            icon_image: None,
            drop_target_image: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn notifier_mut(&mut self) -> &mut NotificationHub {
        &mut self.notifier
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Active or hidden - the bubble exists
    pub fn is_active(&self) -> bool {
        self.state != EngineState::Inactive
    }

    pub fn is_hidden(&self) -> bool {
        self.state == EngineState::Hidden
    }

    /// Merged configuration currently in effect
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn bubble_layout(&self) -> Option<&SurfaceLayout> {
        self.bubble.as_ref().map(|b| &b.layout)
    }

    pub fn bubble_position(&self) -> Option<Point> {
        self.bubble_layout().map(|l| l.position)
    }

    pub fn drop_target_layout(&self) -> Option<&SurfaceLayout> {
        self.drop_target.as_ref().map(|t| &t.layout)
    }

    pub fn is_animating(&self) -> bool {
        self.snapper.is_animating()
            || self
                .drop_target
                .as_ref()
                .is_some_and(|t| t.fade.is_some() || t.pulse.is_some())
    }

    pub fn handle_command(&mut self, command: Command) {
        debug!(?command, "Overlay command");
        match command {
            Command::Start(config) => self.start(config),
            Command::Reconfigure(config) => self.reconfigure(config),
            Command::ResetIcon => self.reset_icon(),
            Command::ResetDropTargetIcon => self.reset_drop_target_icon(),
            Command::Hide => self.hide(),
            Command::Show => self.show(),
            Command::Stop => self.stop(),
        }
    }

    // ---- geometry helpers ----

    fn margin(&self) -> i32 {
        self.display.dp_to_px(self.settings.edge_margin_dp).max(0)
    }

    /// Bubble size in pixels, falling back to the default size
    fn icon_size(&self) -> Size {
        let dp = self
            .config
            .icon_size_dp
            .filter(|dp| *dp > 0)
            .unwrap_or(self.settings.default_icon_size_dp);
        let px = self.display.dp_to_px(dp).max(1);
        Size::from((px, px))
    }

    /// Size the bubble has when visible, even while hidden
    fn visible_icon_size(&self) -> Size {
        match &self.bubble {
            Some(BubbleSurface { snapshot: Some(snapshot), .. }) => snapshot.size,
            Some(bubble) => bubble.layout.size,
            None => self.icon_size(),
        }
    }

    fn resting_area(&self) -> RestingArea {
        RestingArea::new(self.display.size(), self.visible_icon_size(), self.margin())
    }

    fn drop_target_geometry(&self) -> DropTargetGeometry {
        let size_dp = self
            .config
            .drop_target_size_dp
            .filter(|dp| *dp > 0)
            .unwrap_or(self.settings.default_drop_target_size_dp);
        DropTargetGeometry::new(&self.display, size_dp, self.settings.drop_target_bottom_margin_dp)
    }

    fn drop_target_disabled(&self) -> bool {
        self.config.drop_target_hidden.unwrap_or(false)
    }

    // ---- lifecycle ----

    /// Bring the bubble up. While already running this acts as `reconfigure`.
    /// `start_hidden` only applies to this start request.
    pub fn start(&mut self, config: OverlayConfig) {
        if self.is_active() {
            debug!("Start while running, applying as reconfigure");
            self.reconfigure(config);
            return;
        }
        self.apply_config(&config);
        if let Err(e) = self.activate(config.start_hidden == Some(true)) {
            warn!("Bubble not started: {}", e);
        }
    }

    fn activate(&mut self, start_hidden: bool) -> Result<()> {
        if !self.host.can_draw_overlays() {
            return Err(OverlayError::PermissionDenied);
        }
        self.display = self.host.display();
        let icon = self.icon_size();
        let area = self.resting_area();
        let saved = self.store.load(&area);

        let max_x = (self.display.width - icon.w).max(0);
        let max_y = (self.display.height - icon.h).max(0);
        let position = match saved {
            Some(p) => Point::from((p.x.clamp(0, max_x), p.y.clamp(0, max_y))),
            None => Point::from((
                (self.display.width - icon.w - self.margin()).max(0),
                max_y / 2,
            )),
        };

        let layout = SurfaceLayout::new(position, icon);
        self.host.add_surface(SurfaceKind::Bubble, &layout)?;
        self.bubble = Some(BubbleSurface {
            layout,
            snapshot: None,
        });
        self.state = EngineState::Active;
        info!(x = position.x, y = position.y, size = icon.w, "Bubble active");

        if let Some(image) = &self.icon_image {
            absorb(
                self.host.set_surface_image(SurfaceKind::Bubble, Some(image)),
                "Setting bubble image",
            );
        }
        self.notifier.notify_active(true);

        if saved.is_none() {
            // So an immediate hide/show or restart lands on the same spot
            self.store.save(position, &area);
        }
        if start_hidden {
            self.hide();
        }
        Ok(())
    }

    /// Merge new configuration; toggles visibility if `start_hidden` is set
    pub fn reconfigure(&mut self, config: OverlayConfig) {
        self.apply_config(&config);
        if self.is_active() {
            match config.start_hidden {
                Some(true) => self.hide(),
                Some(false) => self.show(),
                None => {}
            }
        }
    }

    /// Merge `config` into the session configuration and apply what changed.
    /// Visibility requests are one-shot and never stored.
    fn apply_config(&mut self, config: &OverlayConfig) {
        let update = OverlayConfig {
            icon_size_dp: config.icon_size_dp.filter(|dp| *dp > 0),
            drop_target_size_dp: config.drop_target_size_dp.filter(|dp| *dp > 0),
            start_hidden: None,
            ..config.clone()
        };
        self.config.merge(&update);

        if update.icon_size_dp.is_some() {
            self.resize_bubble();
        }
        if let Some(source) = &update.icon_source {
            self.load_image(SurfaceKind::Bubble, source);
        }
        if update.drop_target_size_dp.is_some() {
            self.relayout_drop_target();
        }
        if let Some(source) = &update.drop_target_source {
            self.load_image(SurfaceKind::DropTarget, source);
        }
        if update.drop_target_hidden == Some(true) {
            self.dismiss_drop_target(false);
        }
    }

    fn load_image(&mut self, kind: SurfaceKind, source: &str) {
        let image = match self.loader.load(source) {
            Ok(image) => image,
            Err(e) => {
                warn!("Keeping previous {} image: {}", kind, e);
                return;
            }
        };
        let live = match kind {
            SurfaceKind::Bubble => self.bubble.is_some(),
            SurfaceKind::DropTarget => self.drop_target.is_some(),
        };
        if live {
            absorb(
                self.host.set_surface_image(kind, Some(&image)),
                "Setting surface image",
            );
        }
        match kind {
            SurfaceKind::Bubble => self.icon_image = Some(image),
            SurfaceKind::DropTarget => self.drop_target_image = Some(image),
        }
    }

    fn resize_bubble(&mut self) {
        let size = self.icon_size();
        let Some(bubble) = self.bubble.as_mut() else {
            return;
        };
        if let Some(snapshot) = bubble.snapshot.as_mut() {
            // Applied on show
            snapshot.size = size;
            return;
        }
        let previous = bubble.layout.size;
        bubble.layout.size = size;
        if !absorb(
            self.host.update_surface(SurfaceKind::Bubble, &bubble.layout),
            "Resizing bubble",
        ) {
            bubble.layout.size = previous;
        }
    }

    pub fn reset_icon(&mut self) {
        self.config.icon_source = None;
        self.config.icon_size_dp = None;
        self.icon_image = None;
        if self.bubble.is_some() {
            absorb(
                self.host.set_surface_image(SurfaceKind::Bubble, None),
                "Resetting bubble image",
            );
            self.resize_bubble();
        }
    }

    pub fn reset_drop_target_icon(&mut self) {
        self.config.drop_target_source = None;
        self.config.drop_target_size_dp = None;
        self.drop_target_image = None;
        if self.drop_target.is_some() {
            absorb(
                self.host.set_surface_image(SurfaceKind::DropTarget, None),
                "Resetting drop target image",
            );
            self.relayout_drop_target();
        }
    }

    pub fn hide(&mut self) {
        if self.state != EngineState::Active {
            return;
        }
        self.abandon_gesture();
        let Some(bubble) = self.bubble.as_mut() else {
            return;
        };

        let before = bubble.layout;
        bubble.snapshot = Some(HiddenSnapshot {
            size: before.size,
            touchable: before.touchable,
        });
        bubble.layout.size = Size::from((1, 1));
        bubble.layout.alpha = 0.0;
        bubble.layout.touchable = false;

        if !absorb(
            self.host.update_surface(SurfaceKind::Bubble, &bubble.layout),
            "Hiding bubble",
        ) {
            bubble.layout = before;
            bubble.snapshot = None;
            return;
        }
        self.state = EngineState::Hidden;
        info!("Bubble hidden");
        self.notifier.notify_hidden(true);
    }

    pub fn show(&mut self) {
        if self.state != EngineState::Hidden {
            return;
        }
        let Some(bubble) = self.bubble.as_mut() else {
            return;
        };
        let Some(snapshot) = bubble.snapshot else {
            return;
        };

        let before = bubble.layout;
        bubble.layout.size = snapshot.size;
        bubble.layout.touchable = snapshot.touchable;
        bubble.layout.alpha = 1.0;

        if !absorb(
            self.host.update_surface(SurfaceKind::Bubble, &bubble.layout),
            "Showing bubble",
        ) {
            bubble.layout = before;
            return;
        }
        bubble.snapshot = None;
        self.state = EngineState::Active;
        info!("Bubble shown");
        self.notifier.notify_hidden(false);
    }

    /// Tear everything down
    pub fn stop(&mut self) {
        if !self.is_active() {
            return;
        }
        self.gesture = None;
        self.snapper.cancel();
        self.dismiss_drop_target(false);
        if self.bubble.take().is_some() {
            // Gone either way once we stop tracking it
            absorb(self.host.remove_surface(SurfaceKind::Bubble), "Removing bubble");
        }
        self.state = EngineState::Inactive;
        // Configuration lives for one session, the next start brings its own
        self.config = OverlayConfig::default();
        self.icon_image = None;
        self.drop_target_image = None;
        info!("Bubble inactive");
        self.notifier.notify_active(false);
    }

    /// Display size or density changed (rotation, fold, ...)
    pub fn on_configuration_changed(&mut self) {
        self.display = self.host.display();
        if !self.is_active() {
            return;
        }
        self.abandon_gesture();
        self.snapper.cancel();
        // A drop target still fading out follows the new screen
        self.relayout_drop_target();

        let size = self.icon_size();
        let canonical = self.store.load_canonical();
        if let Some(bubble) = self.bubble.as_mut() {
            match bubble.snapshot.as_mut() {
                Some(snapshot) => snapshot.size = size,
                None => bubble.layout.size = size,
            }
        }
        let area = self.resting_area();
        let Some(bubble) = self.bubble.as_mut() else {
            return;
        };
        match canonical {
            Some(canonical) => {
                bubble.layout.position = area.resolve(canonical);
                info!(
                    x = bubble.layout.position.x,
                    y = bubble.layout.position.y,
                    edge = ?canonical.edge,
                    "Bubble repositioned for new display"
                );
            }
            None => debug!("No saved edge, leaving bubble where it is"),
        }
        let position = bubble.layout.position;
        absorb(
            self.host.update_surface(SurfaceKind::Bubble, &bubble.layout),
            "Updating bubble after display change",
        );
        if canonical.is_some() {
            self.store.save(position, &area);
        }
    }

    // ---- touch ----

    pub fn handle_touch(&mut self, event: TouchEvent) {
        if self.state != EngineState::Active {
            debug!(?event, "Ignoring touch, bubble not touchable");
            return;
        }
        match event {
            TouchEvent::Down { position } => self.on_touch_down(position),
            TouchEvent::Motion { position } => self.on_touch_motion(position),
            TouchEvent::Up { position } => self.on_touch_up(position),
            TouchEvent::Cancel => self.on_touch_cancel(),
        }
    }

    fn on_touch_down(&mut self, touch: Point<f64>) {
        let Some(bubble) = self.bubble.as_ref() else {
            return;
        };
        self.snapper.cancel();
        self.gesture = Some(DragGesture::begin(
            touch,
            bubble.layout.position,
            self.settings.click_slop_px,
        ));
        self.show_drop_target();
    }

    fn on_touch_motion(&mut self, touch: Point<f64>) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let position = gesture.update(touch);
        let Some(bubble) = self.bubble.as_mut() else {
            return;
        };
        bubble.layout.position = position;
        if let Err(e) = self.host.update_surface(SurfaceKind::Bubble, &bubble.layout) {
            debug!("Bubble move not applied: {}", e);
        }
        self.update_hover();
    }

    fn on_touch_up(&mut self, touch: Point<f64>) {
        let Some(mut gesture) = self.gesture.take() else {
            return;
        };
        gesture.track(touch);
        let outcome = classify_release(self.is_over_drop_target(), gesture.is_click());
        debug!(?outcome, delta = ?gesture.delta(), "Touch released");

        match outcome {
            ReleaseOutcome::Drop => {
                info!("Bubble dropped on target, removing");
                self.dismiss_drop_target(false);
                self.notifier.notify_removed();
                self.stop();
            }
            ReleaseOutcome::Tap => {
                self.dismiss_drop_target(true);
                self.host.bring_app_to_front();
            }
            ReleaseOutcome::Drag => {
                self.dismiss_drop_target(true);
                self.settle_bubble();
            }
        }
    }

    fn on_touch_cancel(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        self.dismiss_drop_target(true);
        if !gesture.is_click() {
            self.settle_bubble();
        }
    }

    /// Drop an in-flight gesture without acting on it
    fn abandon_gesture(&mut self) {
        if self.gesture.take().is_some() {
            self.dismiss_drop_target(false);
        }
    }

    /// Clamp into the screen vertically, snap to an edge and persist
    fn settle_bubble(&mut self) {
        let area = self.resting_area();
        let screen = self.display.size();
        let margin = self.margin();
        let Some(bubble) = self.bubble.as_mut() else {
            return;
        };

        let y = bubble.layout.position.y.clamp(0, area.max_y);
        if y != bubble.layout.position.y {
            bubble.layout.position.y = y;
            absorb(
                self.host.update_surface(SurfaceKind::Bubble, &bubble.layout),
                "Clamping bubble",
            );
        }
        let target_x = self
            .snapper
            .snap(bubble.layout.position.x, screen, bubble.layout.size, margin);
        debug!(from = bubble.layout.position.x, to = target_x, "Snapping bubble to edge");
        self.store.save(Point::from((target_x, y)), &area);
    }

    fn is_over_drop_target(&self) -> bool {
        let (Some(bubble), Some(target)) = (&self.bubble, &self.drop_target) else {
            return false;
        };
        if target.dismissing {
            return false;
        }
        HitTester::new(self.drop_target_disabled()).surface_overlaps(
            bubble.layout.position,
            bubble.layout.size,
            self.drop_target_geometry().hit_bounds,
        )
    }

    fn update_hover(&mut self) {
        let hovering = self.is_over_drop_target();
        let hover_scale = self.settings.hover_scale;
        let pulse = self.settings.hover_pulse();
        let Some(target) = self.drop_target.as_mut() else {
            return;
        };
        if target.dismissing || target.hovering == hovering {
            return;
        }
        target.hovering = hovering;
        target.layout.activated = hovering;
        let to = if hovering { hover_scale } else { 1.0 };
        target.pulse = Some(Tween::new(target.layout.scale as f64, to, pulse, Easing::Linear));
        absorb(
            self.host.update_surface(SurfaceKind::DropTarget, &target.layout),
            "Updating drop target hover",
        );
    }

    // ---- drop target ----

    fn show_drop_target(&mut self) {
        if self.drop_target_disabled() {
            return;
        }
        let geometry = self.drop_target_geometry();
        let fade_in = self.settings.fade_in();

        if let Some(target) = self.drop_target.as_mut() {
            // Still fading out from the previous drag, bring it back
            target.dismissing = false;
            target.hovering = false;
            target.pulse = None;
            target.layout.scale = 1.0;
            target.layout.activated = false;
            target.fade = Some(Tween::new(target.layout.alpha as f64, 1.0, fade_in, Easing::Linear));
            return;
        }

        let mut layout = SurfaceLayout::new(geometry.strip.origin(), geometry.strip.size());
        layout.alpha = 0.0;
        layout.touchable = false;
        if !absorb(
            self.host.add_surface(SurfaceKind::DropTarget, &layout),
            "Adding drop target",
        ) {
            return;
        }
        if let Some(image) = &self.drop_target_image {
            absorb(
                self.host.set_surface_image(SurfaceKind::DropTarget, Some(image)),
                "Setting drop target image",
            );
        }
        self.drop_target = Some(DropTarget {
            layout,
            hovering: false,
            fade: Some(Tween::new(0.0, 1.0, fade_in, Easing::Linear)),
            pulse: None,
            dismissing: false,
        });
    }

    /// Fade the drop target out, or remove it right away
    fn dismiss_drop_target(&mut self, animate: bool) {
        if !animate {
            if self.drop_target.take().is_some() {
                absorb(
                    self.host.remove_surface(SurfaceKind::DropTarget),
                    "Removing drop target",
                );
            }
            return;
        }
        let fade_out = self.settings.fade_out();
        if let Some(target) = self.drop_target.as_mut() {
            target.dismissing = true;
            target.hovering = false;
            target.fade = Some(Tween::new(target.layout.alpha as f64, 0.0, fade_out, Easing::Linear));
        }
    }

    /// Size change applies to the live drop target straight away
    fn relayout_drop_target(&mut self) {
        let geometry = self.drop_target_geometry();
        let Some(target) = self.drop_target.as_mut() else {
            return;
        };
        target.layout.position = geometry.strip.origin();
        target.layout.size = geometry.strip.size();
        absorb(
            self.host.update_surface(SurfaceKind::DropTarget, &target.layout),
            "Resizing drop target",
        );
        self.update_hover();
    }

    // ---- animation ----

    /// Advance running animations by `dt`. Returns whether any are still running.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if let Some(x) = self.snapper.advance(dt) {
            if let Some(bubble) = self.bubble.as_mut() {
                bubble.layout.position.x = x;
                if let Err(e) = self.host.update_surface(SurfaceKind::Bubble, &bubble.layout) {
                    debug!("Snap frame not applied: {}", e);
                }
            }
        }

        let mut finished_dismiss = false;
        if let Some(target) = self.drop_target.as_mut() {
            let mut changed = false;
            if let Some(fade) = target.fade.as_mut() {
                target.layout.alpha = fade.advance(dt) as f32;
                changed = true;
                if fade.is_finished() {
                    target.fade = None;
                    finished_dismiss = target.dismissing;
                }
            }
            if let Some(pulse) = target.pulse.as_mut() {
                target.layout.scale = pulse.advance(dt) as f32;
                changed = true;
                if pulse.is_finished() {
                    target.pulse = None;
                }
            }
            if changed && !finished_dismiss {
                if let Err(e) = self.host.update_surface(SurfaceKind::DropTarget, &target.layout) {
                    debug!("Drop target frame not applied: {}", e);
                }
            }
        }
        if finished_dismiss {
            self.dismiss_drop_target(false);
        }

        self.is_animating()
    }
}

#[cfg(test)]
mod tests;
