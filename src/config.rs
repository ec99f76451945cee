//! Engine settings and overlay configuration payloads
//!
//! Two layers:
//! - `EngineSettings`: tuning constants loaded once from TOML (all defaulted)
//! - `OverlayConfig`: the merge-applied payload sent by the controlling layer

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;

/// Flick state directory (~/.local/state/flick or /tmp/flick)
pub fn state_dir() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".local/state")))
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("flick")
}

/// Tuning constants for the overlay engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Gap between a resting bubble and the screen edge
    pub edge_margin_dp: i32,
    /// Bubble size when no size is configured or it cannot be measured
    pub default_icon_size_dp: i32,
    pub default_drop_target_size_dp: i32,
    /// Gap between the drop target hit region and the bottom of the screen
    pub drop_target_bottom_margin_dp: i32,
    /// Max travel in each axis for a touch to still count as a tap
    pub click_slop_px: i32,
    pub snap_duration_ms: u64,
    pub drop_target_fade_in_ms: u64,
    pub drop_target_fade_out_ms: u64,
    pub hover_pulse_ms: u64,
    pub hover_scale: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            edge_margin_dp: 16,
            default_icon_size_dp: 64,
            default_drop_target_size_dp: 70,
            drop_target_bottom_margin_dp: 48,
            click_slop_px: 5,
            snap_duration_ms: 220,
            drop_target_fade_in_ms: 180,
            drop_target_fade_out_ms: 150,
            hover_pulse_ms: 120,
            hover_scale: 1.15,
        }
    }
}

impl EngineSettings {
    /// Load settings from a TOML file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn snap_duration(&self) -> Duration {
        Duration::from_millis(self.snap_duration_ms)
    }

    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.drop_target_fade_in_ms)
    }

    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.drop_target_fade_out_ms)
    }

    pub fn hover_pulse(&self) -> Duration {
        Duration::from_millis(self.hover_pulse_ms)
    }
}

/// Overlay configuration sent with start/reconfigure commands.
///
/// Every field is optional; `None` leaves the current value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayConfig {
    pub icon_source: Option<String>,
    pub icon_size_dp: Option<i32>,
    pub drop_target_source: Option<String>,
    pub drop_target_size_dp: Option<i32>,
    pub drop_target_hidden: Option<bool>,
    pub start_hidden: Option<bool>,
}

impl OverlayConfig {
    /// Parse a JSON payload. Bad fields are skipped one by one, a payload that
    /// is not a JSON object yields an empty config.
    pub fn from_json(payload: &str) -> Self {
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!("Ignoring malformed overlay config payload: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            warn!("Overlay config payload is not an object, ignoring");
            return Self::default();
        };
        let field = |names: &[&str]| names.iter().find_map(|n| obj.get(*n).filter(|v| !v.is_null()));

        Self {
            icon_source: field(&["iconSource"]).and_then(source_field),
            icon_size_dp: field(&["iconSizeDp"]).and_then(size_field),
            drop_target_source: field(&["dropTargetSource", "trashIconSource"]).and_then(source_field),
            drop_target_size_dp: field(&["dropTargetSizeDp", "trashIconSizeDp"]).and_then(size_field),
            drop_target_hidden: field(&["dropTargetHidden", "hideTrash"]).and_then(Value::as_bool),
            start_hidden: field(&["startHidden", "hidden"]).and_then(Value::as_bool),
        }
    }

    /// Overwrite fields that are set in `other`
    pub fn merge(&mut self, other: &OverlayConfig) {
        if other.icon_source.is_some() {
            self.icon_source = other.icon_source.clone();
        }
        if other.icon_size_dp.is_some() {
            self.icon_size_dp = other.icon_size_dp;
        }
        if other.drop_target_source.is_some() {
            self.drop_target_source = other.drop_target_source.clone();
        }
        if other.drop_target_size_dp.is_some() {
            self.drop_target_size_dp = other.drop_target_size_dp;
        }
        if other.drop_target_hidden.is_some() {
            self.drop_target_hidden = other.drop_target_hidden;
        }
        if other.start_hidden.is_some() {
            self.start_hidden = other.start_hidden;
        }
    }
}

fn source_field(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Positive integer sizes only; fractional values truncate, anything else is dropped
fn size_field(value: &Value) -> Option<i32> {
    let size = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))?;
    if size > 0 && size <= i32::MAX as i64 {
        Some(size as i32)
    } else {
        debug!(size, "Ignoring non-positive overlay size");
        None
    }
}
