//! Delivery domain: getting a finished report in front of the user.
//!
//! Each output channel is a [`DeliverySink`]. [`fan_out`] hands the same
//! report to every sink in order; one sink failing (or panicking) never
//! stops the others.

mod clipboard;
mod console;
mod toast;

use std::panic::{self, AssertUnwindSafe};

use crate::report::Report;

pub use clipboard::ClipboardSink;
pub use console::{print_error, print_status, ConsoleSink, CONSOLE_ERROR_PREFIX, CONSOLE_PREFIX};
pub use toast::{toast_position, ToastSink, CHIME_NOTES, TOAST_HEIGHT, TOAST_WIDTH};

/// One output channel for a rendered report.
pub trait DeliverySink: Send + Sync {
    fn name(&self) -> &'static str;
    fn deliver(&self, report: &Report) -> Result<(), DeliveryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("Notification monitor {index} does not exist ({available} connected)")]
    NoSuchMonitor { index: usize, available: usize },

    #[error("Notification window failed: {0}")]
    Window(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("Sink panicked: {0}")]
    Panicked(String),
}

/// What happened at one sink.
#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: &'static str,
    pub result: Result<(), DeliveryError>,
}

/// Per-sink results of one fan-out, in sink order.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<SinkOutcome>,
}

impl DeliveryReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &SinkOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn succeeded(&self, sink: &str) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.sink == sink && o.result.is_ok())
    }
}

/// Delivers `report` to every sink, isolating failures.
pub fn fan_out(sinks: &[Box<dyn DeliverySink>], report: &Report) -> DeliveryReport {
    let mut outcomes = Vec::with_capacity(sinks.len());
    for sink in sinks {
        let result = match panic::catch_unwind(AssertUnwindSafe(|| sink.deliver(report))) {
            Ok(result) => result,
            Err(payload) => Err(DeliveryError::Panicked(panic_message(payload.as_ref()))),
        };
        match &result {
            Ok(()) => log::debug!("[DELIVERY] {} ok", sink.name()),
            Err(e) => log::warn!("[DELIVERY] {} failed: {}", sink.name(), e),
        }
        outcomes.push(SinkOutcome { sink: sink.name(), result });
    }
    DeliveryReport { outcomes }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
