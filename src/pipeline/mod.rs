//! Pipeline domain: one capture request from admission to delivery.
//!
//! Flow: `Idle → Capturing → Analyzing → Formatting → Delivering → Idle`.
//! Admission goes through the [`InFlightLock`]; a request that finds it held
//! is dropped, never queued. Any failure ends the run and returns to `Idle`.
//!
//! The orchestrator holds its collaborators behind traits so the whole flow
//! can be driven in tests with a fake capture source, client and sinks.

mod lock;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::capture::{load_image_file, CaptureError, CaptureSource, CapturedImage};
use crate::delivery::{fan_out, print_error, print_status, DeliveryError, DeliveryReport, DeliverySink, SinkOutcome};
use crate::llm::{check_model_text, AnalysisClient, AnalysisError, SCOREBOARD_INSTRUCTION};
use crate::report::{parse_analysis, Report};

pub use lock::{InFlightGuard, InFlightLock};

pub const BUSY_MESSAGE: &str = "Analysis already in progress, ignoring trigger.";

/// What started a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRequest {
    /// The trigger gesture: capture the configured monitor.
    Hotkey,
    /// Analyse an existing image file instead of capturing.
    FileInput { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Capturing,
    Analyzing,
    Formatting,
    Delivering,
}

/// Knobs the pipeline reads on every run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub capture_monitor: usize,
    pub max_tokens: u32,
    pub analysis_timeout: Duration,
    /// Fail the capture stage when the scoreboard heuristic says no.
    pub require_scoreboard: bool,
}

/// How a run ended. Carries status only; the report itself went to the sinks.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Another run held the lock.
    Dropped,
    CaptureFailed(CaptureError),
    AnalysisFailed(AnalysisError),
    /// Sinks were attempted; individual failures are inside.
    Delivered(DeliveryReport),
}

impl PipelineOutcome {
    /// Process exit status for file-input mode. Sink warnings do not fail
    /// the run.
    pub fn exit_status(&self) -> u8 {
        match self {
            PipelineOutcome::Delivered(_) => 0,
            PipelineOutcome::CaptureFailed(_) | PipelineOutcome::AnalysisFailed(_) => 1,
            PipelineOutcome::Dropped => 2,
        }
    }
}

pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

pub struct Orchestrator {
    capture: Arc<dyn CaptureSource>,
    client: Arc<dyn AnalysisClient>,
    sinks: Arc<Vec<Box<dyn DeliverySink>>>,
    settings: PipelineSettings,
    lock: Arc<InFlightLock>,
    state: Mutex<PipelineState>,
    clock: Clock,
}

impl Orchestrator {
    pub fn new(
        capture: Arc<dyn CaptureSource>,
        client: Arc<dyn AnalysisClient>,
        sinks: Vec<Box<dyn DeliverySink>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            capture,
            client,
            sinks: Arc::new(sinks),
            settings,
            lock: InFlightLock::new(),
            state: Mutex::new(PipelineState::Idle),
            clock: Arc::new(Local::now),
        }
    }

    /// Replaces the report timestamp source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn in_flight(&self) -> bool {
        self.lock.is_held()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Takes the in-flight lock, or reports the drop and returns `None`.
    pub fn try_admit(&self) -> Option<InFlightGuard> {
        let guard = self.lock.try_acquire();
        if guard.is_none() {
            log::info!("[PIPELINE] Trigger dropped: analysis already in progress");
            print_status(BUSY_MESSAGE);
        }
        guard
    }

    /// Admits and runs one request to completion.
    pub async fn handle(&self, request: CaptureRequest) -> PipelineOutcome {
        match self.try_admit() {
            Some(guard) => self.run_admitted(guard, request).await,
            None => PipelineOutcome::Dropped,
        }
    }

    /// Admits `request` on the caller's thread and runs it on `runtime`.
    ///
    /// Used by the input listener: admission is decided before anything is
    /// spawned, so a busy pipeline costs the listener one atomic operation.
    pub fn dispatch(self: &Arc<Self>, runtime: &tokio::runtime::Handle, request: CaptureRequest) -> bool {
        let Some(guard) = self.try_admit() else {
            return false;
        };
        let this = Arc::clone(self);
        runtime.spawn(async move {
            this.run_admitted(guard, request).await;
        });
        true
    }

    /// Runs every stage for an already-admitted request. The lock is
    /// released when `guard` drops at the end of this call.
    pub async fn run_admitted(&self, guard: InFlightGuard, request: CaptureRequest) -> PipelineOutcome {
        let _guard = guard;
        let _idle = IdleOnDrop(&self.state);
        let start = Instant::now();
        log::info!("[PIPELINE] Run started: {:?}", request);

        self.set_state(PipelineState::Capturing);
        let image = match self.capture_stage(request).await {
            Ok(image) => image,
            Err(e) => {
                log::error!("[PIPELINE] Capture failed: {}", e);
                print_error(&format!("Capture failed: {e}"));
                return PipelineOutcome::CaptureFailed(e);
            }
        };

        self.set_state(PipelineState::Analyzing);
        let text = match self.analysis_stage(&image).await {
            Ok(text) => text,
            Err(AnalysisError::NotScoreboard) => {
                log::warn!("[PIPELINE] Model rejected the image as not a scoreboard");
                print_error("Image does not appear to be an OW2 Tab screen.");
                return PipelineOutcome::AnalysisFailed(AnalysisError::NotScoreboard);
            }
            Err(e) => {
                log::error!("[PIPELINE] Analysis failed: {}", e);
                print_error(&format!("Analysis failed: {e}"));
                return PipelineOutcome::AnalysisFailed(e);
            }
        };

        self.set_state(PipelineState::Formatting);
        let result = parse_analysis(&text, (self.clock)());
        let report = Report::render(&result);

        self.set_state(PipelineState::Delivering);
        let delivered = self.delivery_stage(report).await;
        for failure in delivered.failures() {
            if let Err(e) = &failure.result {
                print_error(&format!("{} delivery failed: {e}", failure.sink));
            }
        }

        log::info!(
            "[PIPELINE] Run finished in {}ms ({} of {} sinks ok)",
            start.elapsed().as_millis(),
            delivered.outcomes.len() - delivered.failures().count(),
            delivered.outcomes.len()
        );
        PipelineOutcome::Delivered(delivered)
    }

    async fn capture_stage(&self, request: CaptureRequest) -> Result<CapturedImage, CaptureError> {
        let image = match request {
            CaptureRequest::Hotkey => {
                let source = Arc::clone(&self.capture);
                let monitor = self.settings.capture_monitor;
                tokio::task::spawn_blocking(move || source.capture(monitor))
                    .await
                    .map_err(|e| CaptureError::Worker(e.to_string()))??
            }
            CaptureRequest::FileInput { path } => {
                tokio::task::spawn_blocking(move || load_image_file(&path))
                    .await
                    .map_err(|e| CaptureError::Worker(e.to_string()))??
            }
        };

        if !image.looks_like_scoreboard {
            if self.settings.require_scoreboard {
                return Err(CaptureError::NotScoreboard);
            }
            log::warn!("[PIPELINE] Capture does not look like a scoreboard, analysing anyway");
        }
        Ok(image)
    }

    async fn analysis_stage(&self, image: &CapturedImage) -> Result<String, AnalysisError> {
        let timeout = self.settings.analysis_timeout;
        log::info!(
            "[PIPELINE] Sending {} bytes to {} (timeout {}s)",
            image.bytes.len(),
            self.client.name(),
            timeout.as_secs()
        );
        let call = self
            .client
            .analyze(image, SCOREBOARD_INSTRUCTION, self.settings.max_tokens);
        let raw = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| AnalysisError::Timeout(timeout))??;
        check_model_text(&raw)
    }

    async fn delivery_stage(&self, report: Report) -> DeliveryReport {
        let sinks = Arc::clone(&self.sinks);
        match tokio::task::spawn_blocking(move || fan_out(&sinks, &report)).await {
            Ok(delivered) => delivered,
            Err(e) => {
                log::error!("[PIPELINE] Delivery worker failed: {}", e);
                DeliveryReport {
                    outcomes: vec![SinkOutcome {
                        sink: "fan-out",
                        result: Err(DeliveryError::Panicked(e.to_string())),
                    }],
                }
            }
        }
    }

    fn set_state(&self, next: PipelineState) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        log::debug!("[PIPELINE] {:?} -> {:?}", *state, next);
        *state = next;
    }
}

/// Puts the state machine back to `Idle` on every exit from a run.
struct IdleOnDrop<'a>(&'a Mutex<PipelineState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = PipelineState::Idle;
    }
}
