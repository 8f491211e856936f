//! Console sink plus the one-line status helpers the pipeline prints with.

use std::io::Write;
use std::sync::Mutex;

use super::{DeliveryError, DeliverySink};
use crate::report::Report;

pub const CONSOLE_PREFIX: &str = "[OWL]";
pub const CONSOLE_ERROR_PREFIX: &str = "[OWL ERROR]";

/// Writes the full report text followed by a newline.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

impl DeliverySink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
        // A poisoned writer is still usable; the previous panic was in some
        // other delivery.
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        writeln!(out, "{}", report.text)?;
        out.flush()?;
        Ok(())
    }
}

/// `[OWL] <message>` on stdout.
pub fn print_status(message: &str) {
    println!("{CONSOLE_PREFIX} {message}");
}

/// `[OWL ERROR] <message>` on stderr.
pub fn print_error(message: &str) {
    eprintln!("{CONSOLE_ERROR_PREFIX} {message}");
}
