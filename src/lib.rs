//! OverwatchLooker: scoreboard capture and analysis.
//!
//! Wires the domains together:
//! - Trigger gesture and OS input hooks (trigger/)
//! - Screen capture and image preparation (capture/)
//! - Vision model backends (llm/)
//! - Parsing and rendering the report (report/)
//! - Console, clipboard and toast sinks (delivery/)
//! - The single-flight pipeline (pipeline/)

pub mod capture;
pub mod config;
pub mod delivery;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod trigger;

use std::path::PathBuf;
use std::sync::Arc;

use capture::ScreenCapture;
use config::{BackendConfig, Config};
use delivery::{print_status, ClipboardSink, ConsoleSink, DeliverySink, ToastSink};
use pipeline::{CaptureRequest, Orchestrator, PipelineOutcome};
use trigger::ListenerError;

/// Builds the production orchestrator: real screen, configured backend,
/// console + clipboard + toast in that order.
pub fn build_orchestrator(config: &Config) -> Orchestrator {
    let sinks: Vec<Box<dyn DeliverySink>> = vec![
        Box::new(ConsoleSink::stdout()),
        Box::new(ClipboardSink),
        Box::new(ToastSink::new(config.notify_monitor, config.notify_duration)),
    ];
    Orchestrator::new(
        Arc::new(ScreenCapture),
        llm::client_for(&config.backend),
        sinks,
        config.pipeline_settings(),
    )
}

/// One-shot mode: analyse `path` and return the process exit status.
pub async fn run_file_input(config: &Config, path: PathBuf) -> u8 {
    log::info!("[PIPELINE] File input: {}", path.display());
    let orchestrator = build_orchestrator(config);
    let outcome = orchestrator.handle(CaptureRequest::FileInput { path }).await;

    // The toast lives on a thread of this process; keep it on screen.
    if let PipelineOutcome::Delivered(report) = &outcome {
        if report.succeeded("notification") {
            tokio::time::sleep(config.notify_duration).await;
        }
    }
    outcome.exit_status()
}

/// Listener mode: runs until Ctrl+C.
pub async fn run_hotkey_mode(config: &Config) -> Result<(), ListenerError> {
    let orchestrator = Arc::new(build_orchestrator(config));
    let runtime = tokio::runtime::Handle::current();

    let settings = config.trigger_settings();
    let gesture = format!("{:?} + {}", settings.modifier, settings.button);
    let listener = {
        let orchestrator = Arc::clone(&orchestrator);
        trigger::start(settings, move |request| {
            orchestrator.dispatch(&runtime, request);
        })?
    };

    print_status(&format!(
        "OverwatchLooker listening ({}, model {}). Trigger: {}. Press Ctrl+C to quit.",
        llm_backend_name(config),
        config.backend.model(),
        gesture
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("[PIPELINE] Failed to wait for Ctrl+C: {}", e);
    }

    print_status("Shutting down...");
    listener.stop();
    if orchestrator.in_flight() {
        log::info!("[PIPELINE] Abandoning in-flight analysis on shutdown");
    }
    Ok(())
}

fn llm_backend_name(config: &Config) -> &'static str {
    match config.backend {
        BackendConfig::Anthropic { .. } => "anthropic",
        BackendConfig::Bedrock { .. } => "bedrock",
    }
}
