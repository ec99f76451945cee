//! Icon image loading
//!
//! Sources can be:
//! - `data:<mime>;base64,<payload>` inline images
//! - `file:` URIs
//! - plain filesystem paths

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{OverlayError, Result};

/// Decoded RGBA icon, ready to hand to the overlay host
#[derive(Clone, PartialEq, Eq)]
pub struct IconImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl fmt::Debug for IconImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Turns an image reference into pixels
pub trait ImageLoader {
    fn load(&self, source: &str) -> Result<IconImage>;
}

/// Default loader backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodingImageLoader;

impl ImageLoader for DecodingImageLoader {
    fn load(&self, source: &str) -> Result<IconImage> {
        let decoded = if let Some(rest) = source.strip_prefix("data:") {
            let (_, payload) = rest
                .split_once(',')
                .ok_or_else(|| OverlayError::Image("data URI has no payload".into()))?;
            // Inline payloads are often line-wrapped
            let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(payload)
                .map_err(|e| OverlayError::Image(format!("bad base64 payload: {}", e)))?;
            image::load_from_memory(&bytes)
        } else if source.starts_with("content:") {
            return Err(OverlayError::UnsupportedSource(source.to_string()));
        } else {
            let path = source
                .strip_prefix("file://")
                .or_else(|| source.strip_prefix("file:"))
                .unwrap_or(source);
            image::open(path)
        }
        .map_err(|e| OverlayError::Image(e.to_string()))?;

        let rgba = decoded.to_rgba8();
        Ok(IconImage {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }
}
