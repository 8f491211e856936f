//! Screen capture domain: public API.
//!
//! This module owns all capture functionality: grabbing a monitor, loading
//! an image file given on the command line, and shaping either into an
//! upload-ready [`CapturedImage`]. External code should only use the items
//! exported here.

mod prepare;
mod screenshot;

pub use prepare::{load_image_file, looks_like_scoreboard, prepare_frame, MAX_LONG_EDGE, MAX_UPLOAD_BYTES};
pub use screenshot::{monitor_rect, MonitorRect};

use image::DynamicImage;
use std::path::PathBuf;

/// One still image ready to hand to the analysis client.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Encoded image bytes (PNG for screen captures).
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub media_type: &'static str,
    pub width: u32,
    pub height: u32,
    /// Result of the header-band heuristic, computed while the pixels were
    /// still decoded.
    pub looks_like_scoreboard: bool,
}

/// Produces one still image of a monitor on demand.
pub trait CaptureSource: Send + Sync {
    /// Captures the monitor at 1-based `monitor_index` (1 = primary).
    fn capture(&self, monitor_index: usize) -> Result<CapturedImage, CaptureError>;
}

/// Capture source backed by the real displays.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScreenCapture;

impl CaptureSource for ScreenCapture {
    fn capture(&self, monitor_index: usize) -> Result<CapturedImage, CaptureError> {
        let start = std::time::Instant::now();
        let frame = screenshot::capture_monitor(monitor_index)?;
        let capture_ms = start.elapsed().as_millis();

        let prepared = prepare_frame(&DynamicImage::ImageRgba8(frame))?;
        log::info!(
            "[CAPTURE] Monitor {} captured in {}ms, encoded in {}ms ({} bytes)",
            monitor_index,
            capture_ms,
            start.elapsed().as_millis() - capture_ms,
            prepared.bytes.len()
        );
        Ok(prepared)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("Monitor {index} does not exist ({available} connected)")]
    InvalidMonitor { index: usize, available: usize },

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Cannot read image {}: {reason}", path.display())]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("PNG encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Capture does not look like a scoreboard")]
    NotScoreboard,

    #[error("Capture worker failed: {0}")]
    Worker(String),
}
