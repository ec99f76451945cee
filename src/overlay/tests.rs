use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use super::testing::{HostOp, RecordingHost, StubLoader};
use super::*;
use crate::error::OverlayError;
use crate::position::{MemoryBackend, PositionBackend, PositionRecord, ScreenEdge};

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Active(bool),
    Hidden(bool),
    Removed,
}

struct Harness {
    engine: OverlayController<RecordingHost>,
    backend: MemoryBackend,
    events: Rc<RefCell<Vec<Event>>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_record(PositionRecord::default())
    }

    /// 1080x2000 at density 2: bubble 128px, margin 32px, drop hit region (400,1624) 280x280
    fn with_record(record: PositionRecord) -> Self {
        let host = RecordingHost::new(DisplayMetrics::new(1080, 2000, 2.0));
        let backend = MemoryBackend::with_record(record);
        let mut engine = OverlayController::new(
            host,
            EngineSettings::default(),
            PositionStore::new(backend.clone()),
            StubLoader,
        );

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        engine
            .notifier_mut()
            .set_active_listener(move |a| sink.borrow_mut().push(Event::Active(a)));
        let sink = events.clone();
        engine
            .notifier_mut()
            .set_hidden_listener(move |h| sink.borrow_mut().push(Event::Hidden(h)));
        let sink = events.clone();
        engine
            .notifier_mut()
            .set_removed_listener(move || sink.borrow_mut().push(Event::Removed));

        Self {
            engine,
            backend,
            events,
        }
    }

    fn started() -> Self {
        let mut harness = Self::new();
        harness.engine.start(OverlayConfig::default());
        harness
    }

    fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    fn touch(&mut self, event: TouchEvent) {
        self.engine.handle_touch(event);
    }

    /// Full down / move / up sequence
    fn drag(&mut self, from: (f64, f64), to: (f64, f64)) {
        self.touch(TouchEvent::down(from.0, from.1));
        self.touch(TouchEvent::motion(to.0, to.1));
        self.touch(TouchEvent::up(to.0, to.1));
    }

    fn settle(&mut self) {
        for _ in 0..200 {
            if !self.engine.tick(FRAME) {
                break;
            }
        }
    }

    fn host(&self) -> &RecordingHost {
        self.engine.host()
    }
}

#[test]
fn test_first_start_rests_right_center_and_persists() {
    let mut h = Harness::started();

    assert_eq!(h.engine.state(), EngineState::Active);
    assert_eq!(h.engine.bubble_position(), Some(Point::from((920, 936))));
    assert_eq!(
        h.host().surface(SurfaceKind::Bubble).map(|l| l.size),
        Some(Size::from((128, 128)))
    );
    assert_eq!(h.events(), vec![Event::Active(true)]);

    let record = h.backend.snapshot();
    assert_eq!(record.last_edge, Some(ScreenEdge::Right));
    assert!((record.last_y_ratio.unwrap() - 936.0 / 1872.0).abs() < 1e-9);

    // Stop and start again lands on exactly the same spot
    h.engine.stop();
    h.engine.start(OverlayConfig::default());
    assert_eq!(h.engine.bubble_position(), Some(Point::from((920, 936))));
}

#[test]
fn test_start_without_permission() {
    let mut h = Harness::new();
    h.engine.host_mut().permitted = false;
    h.engine.start(OverlayConfig::default());

    assert_eq!(h.engine.state(), EngineState::Inactive);
    assert!(h.host().surfaces.is_empty());
    assert!(h.events().is_empty());
    assert_eq!(h.backend.snapshot(), PositionRecord::default());
}

#[test]
fn test_start_when_surface_cannot_be_added() {
    let mut h = Harness::new();
    h.engine.host_mut().fail_adds = true;
    h.engine.start(OverlayConfig::default());

    assert!(!h.engine.is_active());
    assert!(h.events().is_empty());
}

#[test]
fn test_start_uses_saved_edge_and_ratio() {
    let mut h = Harness::with_record(PositionRecord {
        last_edge: Some(ScreenEdge::Left),
        last_y_ratio: Some(0.25),
        ..Default::default()
    });
    h.engine.start(OverlayConfig::default());
    assert_eq!(h.engine.bubble_position(), Some(Point::from((32, 468))));
}

#[test]
fn test_start_migrates_legacy_position() {
    let mut h = Harness::with_record(PositionRecord {
        last_x: Some(700),
        last_y: Some(1404),
        ..Default::default()
    });
    h.engine.start(OverlayConfig::default());

    assert_eq!(h.engine.bubble_position(), Some(Point::from((920, 1404))));
    assert_eq!(h.backend.snapshot().last_edge, Some(ScreenEdge::Right));
}

#[test]
fn test_start_hidden() {
    let mut h = Harness::new();
    h.engine.start(OverlayConfig {
        start_hidden: Some(true),
        ..Default::default()
    });

    assert_eq!(h.engine.state(), EngineState::Hidden);
    assert_eq!(h.events(), vec![Event::Active(true), Event::Hidden(true)]);
    let layout = h.host().surface(SurfaceKind::Bubble).unwrap();
    assert_eq!(layout.size, Size::from((1, 1)));
    assert_eq!(layout.alpha, 0.0);
    assert!(!layout.touchable);
}

#[test]
fn test_hide_show_round_trip() {
    let mut h = Harness::started();
    let before = *h.host().surface(SurfaceKind::Bubble).unwrap();

    h.engine.hide();
    h.engine.hide();
    assert!(h.engine.is_hidden());

    h.engine.show();
    h.engine.show();
    assert_eq!(h.engine.state(), EngineState::Active);
    assert_eq!(*h.host().surface(SurfaceKind::Bubble).unwrap(), before);

    assert_eq!(
        h.events(),
        vec![Event::Active(true), Event::Hidden(true), Event::Hidden(false)]
    );
}

#[test]
fn test_show_and_hide_when_not_applicable() {
    let mut h = Harness::new();
    h.engine.hide();
    h.engine.show();
    assert!(h.events().is_empty());

    h.engine.start(OverlayConfig::default());
    h.engine.show();
    assert_eq!(h.events(), vec![Event::Active(true)]);
}

#[test]
fn test_failed_hide_keeps_state() {
    let mut h = Harness::started();
    h.engine.host_mut().fail_updates = true;
    h.engine.hide();

    assert_eq!(h.engine.state(), EngineState::Active);
    assert_eq!(h.engine.bubble_layout().unwrap().size, Size::from((128, 128)));
    assert_eq!(h.events(), vec![Event::Active(true)]);
}

#[test]
fn test_stop_is_reported_once() {
    let mut h = Harness::started();
    h.engine.stop();
    h.engine.stop();

    assert_eq!(h.engine.state(), EngineState::Inactive);
    assert!(h.host().surfaces.is_empty());
    assert_eq!(h.events(), vec![Event::Active(true), Event::Active(false)]);
}

#[test]
fn test_drag_snaps_to_left_edge() {
    let mut h = Harness::started();

    h.touch(TouchEvent::down(950.0, 970.0));
    assert!(h.host().surface(SurfaceKind::DropTarget).is_some());

    h.touch(TouchEvent::motion(80.0, 974.0));
    assert_eq!(h.engine.bubble_position(), Some(Point::from((50, 940))));

    h.touch(TouchEvent::up(80.0, 974.0));
    let record = h.backend.snapshot();
    assert_eq!(record.last_edge, Some(ScreenEdge::Left));
    assert_eq!(record.legacy(), Some(Point::from((32, 940))));
    assert!(h.engine.is_animating());

    h.settle();
    assert_eq!(h.engine.bubble_position(), Some(Point::from((32, 940))));
    assert_eq!(
        h.host().surface(SurfaceKind::Bubble).unwrap().position,
        Point::from((32, 940))
    );
    assert!(h.host().surface(SurfaceKind::DropTarget).is_none());
    assert_eq!(h.host().count(&HostOp::Remove(SurfaceKind::DropTarget)), 1);
    assert_eq!(h.events(), vec![Event::Active(true)]);
}

#[test]
fn test_every_move_repositions_once() {
    let mut h = Harness::started();
    h.touch(TouchEvent::down(950.0, 970.0));
    let before = h.host().count(&HostOp::Update(SurfaceKind::Bubble));

    for i in 1..=3 {
        h.touch(TouchEvent::motion(950.0 - 40.0 * i as f64, 970.0));
    }
    assert_eq!(h.host().count(&HostOp::Update(SurfaceKind::Bubble)), before + 3);
    assert_eq!(h.engine.bubble_position(), Some(Point::from((800, 936))));
}

#[test]
fn test_release_below_vertical_bounds_is_clamped() {
    let mut h = Harness::started();
    h.engine.reconfigure(OverlayConfig {
        drop_target_hidden: Some(true),
        ..Default::default()
    });
    h.drag((950.0, 970.0), (950.0, 2500.0));
    h.settle();
    assert_eq!(h.engine.bubble_position(), Some(Point::from((920, 1872))));
    assert!((h.backend.snapshot().last_y_ratio.unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_tap_brings_app_forward_without_moving() {
    let mut h = Harness::started();
    let record = h.backend.snapshot();

    h.touch(TouchEvent::down(980.0, 1000.0));
    h.touch(TouchEvent::motion(983.0, 996.0));
    h.touch(TouchEvent::up(983.0, 996.0));

    assert_eq!(h.host().count(&HostOp::BringToFront), 1);
    assert_eq!(h.engine.bubble_position(), Some(Point::from((923, 932))));
    assert_eq!(h.backend.snapshot(), record);

    h.settle();
    assert!(h.host().surface(SurfaceKind::DropTarget).is_none());
    // No snap happened
    assert_eq!(h.engine.bubble_position(), Some(Point::from((923, 932))));
}

#[test]
fn test_drop_removes_bubble() {
    let mut h = Harness::started();

    h.touch(TouchEvent::down(984.0, 1000.0));
    h.touch(TouchEvent::motion(540.0, 1764.0));
    assert!(h.engine.drop_target_layout().unwrap().activated);

    h.touch(TouchEvent::up(540.0, 1764.0));
    assert_eq!(h.engine.state(), EngineState::Inactive);
    assert!(h.host().surfaces.is_empty());
    assert!(!h.engine.is_animating());
    assert_eq!(
        h.events(),
        vec![Event::Active(true), Event::Removed, Event::Active(false)]
    );
}

#[test]
fn test_drop_wins_over_tap() {
    let mut h = Harness::new();
    // 300dp target: hit region covers most of the lower screen, bubble center included
    h.engine.start(OverlayConfig {
        drop_target_size_dp: Some(300),
        ..Default::default()
    });

    h.touch(TouchEvent::down(984.0, 1000.0));
    h.touch(TouchEvent::up(984.0, 1000.0));

    assert!(!h.engine.is_active());
    assert_eq!(h.host().count(&HostOp::BringToFront), 0);
    assert!(h.events().contains(&Event::Removed));
}

#[test]
fn test_hidden_drop_target_disables_drop() {
    let mut h = Harness::new();
    h.engine.start(OverlayConfig {
        drop_target_hidden: Some(true),
        ..Default::default()
    });

    h.touch(TouchEvent::down(984.0, 1000.0));
    assert!(h.host().surface(SurfaceKind::DropTarget).is_none());
    h.touch(TouchEvent::motion(540.0, 1764.0));
    h.touch(TouchEvent::up(540.0, 1764.0));

    assert!(h.engine.is_active());
    assert!(!h.events().contains(&Event::Removed));
    h.settle();
    assert_eq!(h.engine.bubble_position(), Some(Point::from((920, 1700))));
}

#[test]
fn test_drop_target_resize_applies_mid_drag() {
    let mut h = Harness::started();

    h.touch(TouchEvent::down(984.0, 1000.0));
    h.touch(TouchEvent::motion(200.0, 800.0));
    assert!(!h.engine.drop_target_layout().unwrap().activated);

    h.engine.reconfigure(OverlayConfig {
        drop_target_size_dp: Some(300),
        ..Default::default()
    });
    assert!(h.engine.drop_target_layout().unwrap().activated);

    h.touch(TouchEvent::up(200.0, 800.0));
    assert!(!h.engine.is_active());
}

#[test]
fn test_hover_pulse_and_release() {
    let mut h = Harness::started();
    h.touch(TouchEvent::down(984.0, 1000.0));
    h.touch(TouchEvent::motion(540.0, 1764.0));
    for _ in 0..20 {
        h.engine.tick(FRAME);
    }
    let target = h.engine.drop_target_layout().unwrap();
    assert!((target.scale - 1.15).abs() < 1e-6);
    assert_eq!(target.alpha, 1.0);

    h.touch(TouchEvent::motion(200.0, 800.0));
    for _ in 0..20 {
        h.engine.tick(FRAME);
    }
    let target = h.engine.drop_target_layout().unwrap();
    assert!(!target.activated);
    assert!((target.scale - 1.0).abs() < 1e-6);
}

#[test]
fn test_new_touch_revives_fading_drop_target() {
    let mut h = Harness::started();
    h.touch(TouchEvent::down(984.0, 1000.0));
    h.engine.tick(Duration::from_millis(200));
    h.touch(TouchEvent::up(984.0, 1000.0));
    h.engine.tick(Duration::from_millis(50));
    assert!(h.engine.drop_target_layout().unwrap().alpha < 1.0);

    h.touch(TouchEvent::down(984.0, 1000.0));
    h.settle();
    assert_eq!(h.engine.drop_target_layout().unwrap().alpha, 1.0);
    assert_eq!(h.host().count(&HostOp::Add(SurfaceKind::DropTarget)), 1);
}

#[test]
fn test_surface_failures_do_not_stick() {
    let mut h = Harness::started();
    h.engine.host_mut().fail_updates = true;

    h.drag((950.0, 970.0), (80.0, 974.0));
    h.settle();

    assert_eq!(h.engine.state(), EngineState::Active);
    assert_eq!(h.backend.snapshot().last_edge, Some(ScreenEdge::Left));
    assert!(!h.engine.is_animating());

    // The next gesture works normally once the host recovers
    h.engine.host_mut().fail_updates = false;
    h.drag((96.0, 1004.0), (900.0, 1004.0));
    h.settle();
    assert_eq!(h.engine.bubble_position(), Some(Point::from((920, 940))));
}

#[test]
fn test_touch_ignored_while_hidden() {
    let mut h = Harness::started();
    h.engine.hide();
    h.drag((950.0, 970.0), (80.0, 974.0));

    assert!(h.host().surface(SurfaceKind::DropTarget).is_none());
    assert_eq!(h.engine.bubble_position(), Some(Point::from((920, 936))));
}

#[test]
fn test_hide_mid_drag_abandons_gesture() {
    let mut h = Harness::started();
    h.touch(TouchEvent::down(950.0, 970.0));
    h.touch(TouchEvent::motion(540.0, 1764.0));
    h.engine.hide();

    assert!(h.host().surface(SurfaceKind::DropTarget).is_none());
    h.engine.show();
    h.touch(TouchEvent::up(540.0, 1764.0));
    assert!(h.engine.is_active());
    assert!(!h.events().contains(&Event::Removed));
}

#[test]
fn test_cancel_after_drag_snaps() {
    let mut h = Harness::started();
    h.touch(TouchEvent::down(950.0, 970.0));
    h.touch(TouchEvent::motion(80.0, 974.0));
    h.touch(TouchEvent::Cancel);
    h.settle();

    assert_eq!(h.engine.bubble_position(), Some(Point::from((32, 940))));
    assert_eq!(h.host().count(&HostOp::BringToFront), 0);
}

#[test]
fn test_rotation_keeps_edge_and_ratio() {
    let mut h = Harness::started();
    let rotated = h.host().display.rotated();
    h.engine.host_mut().display = rotated;
    h.engine.on_configuration_changed();

    // Landscape 2000x1080: right edge 2000-128-32, half of (1080-128)
    assert_eq!(h.engine.bubble_position(), Some(Point::from((1840, 476))));
    let record = h.backend.snapshot();
    assert_eq!(record.last_edge, Some(ScreenEdge::Right));
    assert!((record.last_y_ratio.unwrap() - 0.5).abs() < 1e-9);

    // And back again
    let portrait = h.host().display.rotated();
    h.engine.host_mut().display = portrait;
    h.engine.on_configuration_changed();
    assert_eq!(h.engine.bubble_position(), Some(Point::from((920, 936))));
}

#[test]
fn test_rotation_while_hidden_keeps_it_hidden() {
    let mut h = Harness::started();
    h.engine.hide();
    let rotated = h.host().display.rotated();
    h.engine.host_mut().display = rotated;
    h.engine.on_configuration_changed();

    let layout = h.host().surface(SurfaceKind::Bubble).unwrap();
    assert_eq!(layout.size, Size::from((1, 1)));
    assert_eq!(layout.position, Point::from((1840, 476)));

    h.engine.show();
    assert_eq!(h.engine.bubble_layout().unwrap().size, Size::from((128, 128)));
}

#[test]
fn test_rotation_while_inactive_only_updates_metrics() {
    let mut h = Harness::new();
    let rotated = h.host().display.rotated();
    h.engine.host_mut().display = rotated;
    h.engine.on_configuration_changed();
    assert!(h.host().ops.is_empty());
    assert_eq!(h.backend.snapshot(), PositionRecord::default());
}

#[test]
fn test_reconfigure_icon_size() {
    let mut h = Harness::started();
    h.engine.reconfigure(OverlayConfig {
        icon_size_dp: Some(48),
        ..Default::default()
    });
    assert_eq!(h.engine.bubble_layout().unwrap().size, Size::from((96, 96)));

    h.engine.reconfigure(OverlayConfig {
        icon_size_dp: Some(0),
        ..Default::default()
    });
    assert_eq!(h.engine.bubble_layout().unwrap().size, Size::from((96, 96)));
    assert_eq!(h.engine.config().icon_size_dp, Some(48));
}

#[test]
fn test_resize_while_hidden_applies_on_show() {
    let mut h = Harness::started();
    h.engine.hide();
    h.engine.reconfigure(OverlayConfig {
        icon_size_dp: Some(40),
        ..Default::default()
    });
    assert_eq!(h.engine.bubble_layout().unwrap().size, Size::from((1, 1)));

    h.engine.show();
    assert_eq!(h.engine.bubble_layout().unwrap().size, Size::from((80, 80)));
}

#[test]
fn test_reconfigure_hidden_flag_toggles_visibility() {
    let mut h = Harness::started();
    h.engine.handle_command(Command::Reconfigure(OverlayConfig {
        start_hidden: Some(true),
        ..Default::default()
    }));
    assert!(h.engine.is_hidden());

    // Start while running behaves like reconfigure, no second active event
    h.engine.handle_command(Command::Start(OverlayConfig {
        start_hidden: Some(false),
        ..Default::default()
    }));
    assert_eq!(h.engine.state(), EngineState::Active);
    assert_eq!(
        h.events(),
        vec![Event::Active(true), Event::Hidden(true), Event::Hidden(false)]
    );
}

#[test]
fn test_config_before_start_is_remembered() {
    let mut h = Harness::new();
    h.engine.reconfigure(OverlayConfig {
        icon_size_dp: Some(32),
        icon_source: Some("bubble.png".into()),
        ..Default::default()
    });
    assert!(h.host().ops.is_empty());

    h.engine.start(OverlayConfig::default());
    assert_eq!(h.engine.bubble_layout().unwrap().size, Size::from((64, 64)));
    assert_eq!(h.host().count(&HostOp::Image(SurfaceKind::Bubble, true)), 1);
}

#[test]
fn test_bad_icon_source_keeps_previous_image() {
    let mut h = Harness::started();
    h.engine.reconfigure(OverlayConfig {
        icon_source: Some("missing".into()),
        ..Default::default()
    });
    assert_eq!(h.host().count(&HostOp::Image(SurfaceKind::Bubble, true)), 0);
}

#[test]
fn test_reset_icon_restores_default() {
    let mut h = Harness::started();
    h.engine.reconfigure(OverlayConfig {
        icon_size_dp: Some(100),
        icon_source: Some("custom.png".into()),
        ..Default::default()
    });
    h.engine.handle_command(Command::ResetIcon);

    assert_eq!(h.host().count(&HostOp::Image(SurfaceKind::Bubble, false)), 1);
    assert_eq!(h.engine.bubble_layout().unwrap().size, Size::from((128, 128)));
    assert_eq!(h.engine.config().icon_source, None);
}

#[test]
fn test_drop_target_image_follows_config() {
    let mut h = Harness::started();
    h.engine.reconfigure(OverlayConfig {
        drop_target_source: Some("trash.png".into()),
        drop_target_size_dp: Some(300),
        ..Default::default()
    });
    h.touch(TouchEvent::down(984.0, 1000.0));
    assert_eq!(h.host().count(&HostOp::Image(SurfaceKind::DropTarget, true)), 1);

    h.engine.handle_command(Command::ResetDropTargetIcon);
    assert_eq!(h.host().count(&HostOp::Image(SurfaceKind::DropTarget, false)), 1);
    // Back to the 70dp target, the resting bubble is no longer over it
    assert!(!h.engine.drop_target_layout().unwrap().activated);
}

#[test]
fn test_start_hidden_applies_to_one_start_only() {
    let mut h = Harness::new();
    h.engine.start(OverlayConfig {
        start_hidden: Some(true),
        ..Default::default()
    });
    h.engine.show();
    h.engine.stop();
    h.engine.start(OverlayConfig::default());

    assert_eq!(h.engine.state(), EngineState::Active);
    assert_eq!(h.engine.config().start_hidden, None);
    assert_eq!(
        h.events(),
        vec![
            Event::Active(true),
            Event::Hidden(true),
            Event::Hidden(false),
            Event::Active(false),
            Event::Active(true),
        ]
    );
}

#[test]
fn test_stop_resets_session_config() {
    let mut h = Harness::new();
    h.engine.start(OverlayConfig {
        drop_target_hidden: Some(true),
        icon_size_dp: Some(40),
        ..Default::default()
    });
    h.engine.stop();
    h.engine.start(OverlayConfig::default());

    assert_eq!(h.engine.bubble_layout().unwrap().size, Size::from((128, 128)));
    h.touch(TouchEvent::down(984.0, 1000.0));
    assert!(h.host().surface(SurfaceKind::DropTarget).is_some());
}

/// Backend whose writes never land
struct ReadOnlyBackend;

impl PositionBackend for ReadOnlyBackend {
    fn read(&self) -> crate::error::Result<PositionRecord> {
        Ok(PositionRecord::default())
    }

    fn write(&mut self, _record: &PositionRecord) -> crate::error::Result<()> {
        Err(OverlayError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }
}

#[test]
fn test_density_change_without_saved_edge_resizes_on_host() {
    let host = RecordingHost::new(DisplayMetrics::new(1080, 2000, 2.0));
    let mut engine = OverlayController::new(
        host,
        EngineSettings::default(),
        PositionStore::new(ReadOnlyBackend),
        StubLoader,
    );
    engine.start(OverlayConfig::default());
    assert_eq!(engine.bubble_position(), Some(Point::from((920, 936))));

    engine.host_mut().display = DisplayMetrics::new(1080, 2000, 3.0);
    engine.on_configuration_changed();

    let layout = engine.host().surface(SurfaceKind::Bubble).unwrap();
    assert_eq!(layout.size, Size::from((192, 192)));
    assert_eq!(layout.position, Point::from((920, 936)));
    assert_eq!(engine.bubble_layout(), Some(layout));
}

#[test]
fn test_rotation_relayouts_fading_drop_target() {
    let mut h = Harness::started();
    h.touch(TouchEvent::down(984.0, 1000.0));
    h.engine.tick(Duration::from_millis(200));
    h.touch(TouchEvent::up(984.0, 1000.0));
    h.engine.tick(Duration::from_millis(50));
    assert!(h.host().surface(SurfaceKind::DropTarget).is_some());

    let rotated = h.host().display.rotated();
    h.engine.host_mut().display = rotated;
    h.engine.on_configuration_changed();

    // Landscape 2000x1080: 280px hit square above a 96px margin
    let target = h.host().surface(SurfaceKind::DropTarget).unwrap();
    assert_eq!(target.position, Point::from((0, 704)));
    assert_eq!(target.size, Size::from((2000, 376)));

    h.settle();
    assert!(h.host().surface(SurfaceKind::DropTarget).is_none());
}
