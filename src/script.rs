//! JSON-lines demo scripts
//!
//! One step per line, e.g.
//! ```text
//! {"type": "start", "config": {"iconSizeDp": 56}}
//! {"type": "down", "x": 950, "y": 970}
//! {"type": "move", "x": 80, "y": 974}
//! {"type": "up", "x": 80, "y": 974}
//! {"type": "wait", "ms": 300}
//! {"type": "rotate"}
//! ```
//! Blank lines and lines starting with `#` are skipped.

use std::io::BufRead;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use flick_bubble::overlay::Command;
use flick_bubble::OverlayConfig;
use flick_bubble::input::TouchEvent;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptStep {
    Start {
        #[serde(default)]
        config: Value,
    },
    Configure {
        #[serde(default)]
        config: Value,
    },
    ResetIcon,
    ResetDropTargetIcon,
    Hide,
    Show,
    Stop,
    Down {
        x: f64,
        y: f64,
    },
    Move {
        x: f64,
        y: f64,
    },
    Up {
        x: f64,
        y: f64,
    },
    Cancel,
    /// Swap display width and height
    Rotate,
    /// Switch to a new display size, keeping density unless given
    Display {
        width: i32,
        height: i32,
        #[serde(default)]
        density: Option<f32>,
    },
    /// Pause the script; handled by the reader
    Wait {
        ms: u64,
    },
}

/// What the event loop should do with a step
#[derive(Debug, Clone)]
pub enum Action {
    Command(Command),
    Touch(TouchEvent),
    Rotate,
    Display {
        width: i32,
        height: i32,
        density: Option<f32>,
    },
}

impl ScriptStep {
    /// Delay the reader should apply, if this is a wait step
    pub fn delay(&self) -> Option<Duration> {
        match self {
            ScriptStep::Wait { ms } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }

    pub fn into_action(self) -> Option<Action> {
        let action = match self {
            ScriptStep::Start { config } => Action::Command(Command::Start(parse_config(&config))),
            ScriptStep::Configure { config } => Action::Command(Command::Reconfigure(parse_config(&config))),
            ScriptStep::ResetIcon => Action::Command(Command::ResetIcon),
            ScriptStep::ResetDropTargetIcon => Action::Command(Command::ResetDropTargetIcon),
            ScriptStep::Hide => Action::Command(Command::Hide),
            ScriptStep::Show => Action::Command(Command::Show),
            ScriptStep::Stop => Action::Command(Command::Stop),
            ScriptStep::Down { x, y } => Action::Touch(TouchEvent::down(x, y)),
            ScriptStep::Move { x, y } => Action::Touch(TouchEvent::motion(x, y)),
            ScriptStep::Up { x, y } => Action::Touch(TouchEvent::up(x, y)),
            ScriptStep::Cancel => Action::Touch(TouchEvent::Cancel),
            ScriptStep::Rotate => Action::Rotate,
            ScriptStep::Display { width, height, density } => Action::Display { width, height, density },
            ScriptStep::Wait { .. } => return None,
        };
        Some(action)
    }
}

fn parse_config(value: &Value) -> OverlayConfig {
    if value.is_null() {
        return OverlayConfig::default();
    }
    OverlayConfig::from_value(value)
}

/// Parse every usable step from a reader. Bad lines are logged and skipped.
pub fn parse_lines(reader: impl BufRead) -> impl Iterator<Item = ScriptStep> {
    reader.lines().enumerate().filter_map(|(n, line)| {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Script read error on line {}: {}", n + 1, e);
                return None;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(step) => Some(step),
            Err(e) => {
                warn!("Skipping script line {}: {}", n + 1, e);
                None
            }
        }
    })
}
