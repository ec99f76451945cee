//! Error types for the bubble overlay engine

use thiserror::Error;

use crate::overlay::SurfaceKind;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("overlay permission not granted")]
    PermissionDenied,

    #[error("{kind} surface operation failed: {reason}")]
    Surface { kind: SurfaceKind, reason: String },

    #[error("{0} surface does not exist")]
    SurfaceMissing(SurfaceKind),

    #[error("image load failed: {0}")]
    Image(String),

    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),

    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
