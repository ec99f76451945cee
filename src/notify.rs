//! State change notifications for the controlling layer
//!
//! Each event kind has a single listener slot. Setting a listener replaces
//! the previous one, events raised while a slot is empty are dropped.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

type StateListener = Box<dyn FnMut(bool)>;
type RemovedListener = Box<dyn FnMut()>;

#[derive(Default)]
pub struct NotificationHub {
    active: Option<StateListener>,
    hidden: Option<StateListener>,
    removed: Option<RemovedListener>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active_listener(&mut self, listener: impl FnMut(bool) + 'static) {
        self.active = Some(Box::new(listener));
    }

    pub fn set_hidden_listener(&mut self, listener: impl FnMut(bool) + 'static) {
        self.hidden = Some(Box::new(listener));
    }

    pub fn set_removed_listener(&mut self, listener: impl FnMut() + 'static) {
        self.removed = Some(Box::new(listener));
    }

    pub fn notify_active(&mut self, active: bool) {
        if let Some(listener) = self.active.as_mut() {
            guarded("active", || listener(active));
        }
    }

    pub fn notify_hidden(&mut self, hidden: bool) {
        if let Some(listener) = self.hidden.as_mut() {
            guarded("hidden", || listener(hidden));
        }
    }

    pub fn notify_removed(&mut self) {
        if let Some(listener) = self.removed.as_mut() {
            guarded("removed", || listener());
        }
    }
}

/// A panicking listener must not take the engine down with it
fn guarded(event: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(event, "Notification listener panicked");
    }
}
