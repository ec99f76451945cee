//! Bubble position persistence
//!
//! The bubble always comes to rest against the left or right edge, so the
//! durable record is the edge plus how far down the screen it sits
//! (`lastEdge` + `lastYRatio`). That survives rotation, unlike raw pixels.
//! Raw `lastX`/`lastY` are still written for older readers, and records
//! holding only those are migrated the first time they are read.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::state_dir;
use crate::error::Result;
use crate::primitives::{Point, Size};

/// Namespace of the persisted record
pub const PREFS_NAMESPACE: &str = "persistent_bubble";

/// Screen edge a resting bubble is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenEdge {
    Left,
    Right,
}

/// Orientation-stable position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalPosition {
    pub edge: ScreenEdge,
    /// 0.0 = top, 1.0 = bottom of the travel range
    pub y_ratio: f64,
}

/// Persisted key-value layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edge: Option<ScreenEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_y_ratio: Option<f64>,
}

impl PositionRecord {
    /// Canonical form takes precedence whenever both keys are present
    pub fn canonical(&self) -> Option<CanonicalPosition> {
        Some(CanonicalPosition {
            edge: self.last_edge?,
            y_ratio: self.last_y_ratio?.clamp(0.0, 1.0),
        })
    }

    pub fn legacy(&self) -> Option<Point> {
        Some(Point::from((self.last_x?, self.last_y?)))
    }
}

/// Where a bubble of a given size may rest on a given screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestingArea {
    pub left_x: i32,
    pub right_x: i32,
    pub max_y: i32,
}

impl RestingArea {
    pub fn new(screen: Size, icon: Size, margin: i32) -> Self {
        Self {
            left_x: margin,
            right_x: (screen.w - icon.w - margin).max(0),
            max_y: (screen.h - icon.h).max(0),
        }
    }

    /// Closest edge by pixel distance, ties go left
    pub fn nearest_edge(&self, x: i32) -> ScreenEdge {
        if (x - self.left_x).abs() <= (x - self.right_x).abs() {
            ScreenEdge::Left
        } else {
            ScreenEdge::Right
        }
    }

    pub fn edge_x(&self, edge: ScreenEdge) -> i32 {
        match edge {
            ScreenEdge::Left => self.left_x,
            ScreenEdge::Right => self.right_x,
        }
    }

    pub fn y_ratio(&self, y: i32) -> f64 {
        (y as f64 / self.max_y.max(1) as f64).clamp(0.0, 1.0)
    }

    pub fn y_at(&self, ratio: f64) -> i32 {
        ((ratio.clamp(0.0, 1.0) * self.max_y as f64).round() as i32).clamp(0, self.max_y)
    }

    pub fn canonical(&self, position: Point) -> CanonicalPosition {
        CanonicalPosition {
            edge: self.nearest_edge(position.x),
            y_ratio: self.y_ratio(position.y),
        }
    }

    pub fn resolve(&self, canonical: CanonicalPosition) -> Point {
        Point::from((self.edge_x(canonical.edge), self.y_at(canonical.y_ratio)))
    }
}

/// Durable storage for the position record
pub trait PositionBackend {
    fn read(&self) -> Result<PositionRecord>;
    fn write(&mut self, record: &PositionRecord) -> Result<()>;
}

/// JSON file in the flick state directory
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.local/state/flick/persistent_bubble.json`
    pub fn in_state_dir() -> Self {
        Self::new(state_dir().join(format!("{}.json", PREFS_NAMESPACE)))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl PositionBackend for JsonFileBackend {
    fn read(&self) -> Result<PositionRecord> {
        if !self.path.exists() {
            return Ok(PositionRecord::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write(&mut self, record: &PositionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }
}

/// In-process record; clones share the same storage
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    record: Rc<RefCell<PositionRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: PositionRecord) -> Self {
        Self {
            record: Rc::new(RefCell::new(record)),
        }
    }

    pub fn snapshot(&self) -> PositionRecord {
        self.record.borrow().clone()
    }
}

impl PositionBackend for MemoryBackend {
    fn read(&self) -> Result<PositionRecord> {
        Ok(self.record.borrow().clone())
    }

    fn write(&mut self, record: &PositionRecord) -> Result<()> {
        *self.record.borrow_mut() = record.clone();
        Ok(())
    }
}

/// Loads and saves the bubble position in canonical form
pub struct PositionStore {
    backend: Box<dyn PositionBackend>,
}

impl PositionStore {
    pub fn new(backend: impl PositionBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    fn read_record(&self) -> Option<PositionRecord> {
        match self.backend.read() {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Failed to read saved bubble position: {}", e);
                None
            }
        }
    }

    /// Saved position for this resting area, or `None` if nothing was saved.
    /// Legacy pixel records are migrated to canonical form as a side effect.
    pub fn load(&mut self, area: &RestingArea) -> Option<Point> {
        let mut record = self.read_record()?;

        if let Some(canonical) = record.canonical() {
            return Some(area.resolve(canonical));
        }

        let legacy = record.legacy()?;
        let canonical = area.canonical(legacy);
        info!(
            x = legacy.x,
            y = legacy.y,
            edge = ?canonical.edge,
            ratio = canonical.y_ratio,
            "Migrating legacy bubble position"
        );
        record.last_edge = Some(canonical.edge);
        record.last_y_ratio = Some(canonical.y_ratio);
        if let Err(e) = self.backend.write(&record) {
            warn!("Failed to persist migrated bubble position: {}", e);
        }
        Some(area.resolve(canonical))
    }

    pub fn load_canonical(&self) -> Option<CanonicalPosition> {
        self.read_record()?.canonical()
    }

    /// Record a resting position. Writes both the canonical and raw forms.
    pub fn save(&mut self, position: Point, area: &RestingArea) {
        let canonical = area.canonical(position);
        let record = PositionRecord {
            last_x: Some(position.x),
            last_y: Some(position.y),
            last_edge: Some(canonical.edge),
            last_y_ratio: Some(canonical.y_ratio),
        };
        debug!(x = position.x, y = position.y, edge = ?canonical.edge, ratio = canonical.y_ratio, "Saving bubble position");
        if let Err(e) = self.backend.write(&record) {
            warn!("Failed to save bubble position: {}", e);
        }
    }
}
