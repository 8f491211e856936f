//! Monitor enumeration and capture using the `xcap` crate.
//!
//! This is the infrastructure layer: it talks to the OS. Monitor indices
//! are 1-based: index 1 is the primary display, the rest follow in OS
//! enumeration order.

use image::RgbaImage;
use xcap::Monitor;

use super::CaptureError;

/// Position and size of a monitor in virtual-desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Captures the monitor at 1-based `index`.
pub fn capture_monitor(index: usize) -> Result<RgbaImage, CaptureError> {
    let monitor = monitor_at(index)?;
    monitor
        .capture_image()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
}

/// Returns the geometry of the monitor at 1-based `index`.
pub fn monitor_rect(index: usize) -> Result<MonitorRect, CaptureError> {
    let monitor = monitor_at(index)?;
    let geometry = (|| {
        Ok::<_, xcap::XCapError>(MonitorRect {
            x: monitor.x()?,
            y: monitor.y()?,
            width: monitor.width()?,
            height: monitor.height()?,
        })
    })();
    geometry.map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))
}

fn monitor_at(index: usize) -> Result<Monitor, CaptureError> {
    let mut monitors =
        Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;

    let primary_flags: Vec<bool> = monitors
        .iter()
        .map(|m| m.is_primary().unwrap_or(false))
        .collect();
    let order = primary_first_order(&primary_flags);

    let position = index
        .checked_sub(1)
        .and_then(|i| order.get(i).copied())
        .ok_or(CaptureError::InvalidMonitor {
            index,
            available: monitors.len(),
        })?;

    Ok(monitors.swap_remove(position))
}

/// Maps 1-based monitor order onto enumeration positions: the first monitor
/// flagged primary comes first, everything else keeps its relative order.
/// If nothing reports primary, enumeration order is used as-is.
pub(crate) fn primary_first_order(primary_flags: &[bool]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..primary_flags.len()).collect();
    if let Some(primary) = primary_flags.iter().position(|&p| p) {
        order.remove(primary);
        order.insert(0, primary);
    }
    order
}
