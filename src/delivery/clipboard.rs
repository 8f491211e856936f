//! System clipboard sink.

use super::{DeliveryError, DeliverySink};
use crate::report::Report;

/// Replaces the clipboard contents with the report text.
///
/// A fresh `arboard::Clipboard` is opened per delivery; holding one across
/// threads is not portable.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClipboardSink;

impl DeliverySink for ClipboardSink {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| DeliveryError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(report.text.as_str())
            .map_err(|e| DeliveryError::Clipboard(e.to_string()))?;
        log::info!("[DELIVERY] Copied {} chars to clipboard", report.text.chars().count());
        Ok(())
    }
}
