//! End-to-end pipeline runs against fake collaborators.
//!
//! No screen, network or clipboard is touched: capture, analysis and every
//! sink are in-process fakes that count their calls.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use tokio::sync::Semaphore;

use overwatch_looker::capture::{CaptureError, CaptureSource, CapturedImage};
use overwatch_looker::delivery::{ConsoleSink, DeliveryError, DeliverySink};
use overwatch_looker::llm::{AnalysisClient, AnalysisError};
use overwatch_looker::pipeline::{
    CaptureRequest, Orchestrator, PipelineOutcome, PipelineSettings, PipelineState,
};
use overwatch_looker::report::{format_report, parse_analysis, Report};

const MODEL_TEXT: &str = "\
MAP: King's Row
TIME: 11:42
MODE: Hybrid
RESULT: VICTORY

=== YOUR TEAM ===
Role | Player | E | A | D | DMG | H | MIT
TANK | Owl#1234 | 22 | 9 | 4 | 11,204 | 0 | 18,990
SUPPORT | Nest#42 | 8 | 17 | 3 | 3,100 | 12,450 | -

=== ENEMY TEAM ===
Role | Player | E | A | D | DMG | H | MIT
DPS | Raven#777 | 15 | 2 | 9 | 9,876 | 0 | 0

HERO STATS:
Reinhardt - Charge Kills: 3; Fire Strike Kills: 5; Damage Blocked: 18,990";

const MODEL_TEXT_NO_HEROES: &str = "\
MAP: Busan
TIME: 6:03
MODE: Control
RESULT: DEFEAT

=== YOUR TEAM ===
Role | Player | E | A | D | DMG | H | MIT
DPS | Owl#1234 | 10 | 1 | 7 | 5,400 | 0 | 0

=== ENEMY TEAM ===
Role | Player | E | A | D | DMG | H | MIT
TANK | Wall#1 | 19 | 6 | 2 | 8,002 | 0 | 22,310";

// ── Fakes ─────────────────────────────────────────────────────────────────────

fn image(looks_like_scoreboard: bool) -> CapturedImage {
    CapturedImage {
        bytes: vec![0x89, b'P', b'N', b'G'],
        media_type: "image/png",
        width: 1920,
        height: 1080,
        looks_like_scoreboard,
    }
}

struct FakeCapture {
    calls: AtomicUsize,
    result: fn() -> Result<CapturedImage, CaptureError>,
}

impl FakeCapture {
    fn ok() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), result: || Ok(image(true)) })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result: || Err(CaptureError::InvalidMonitor { index: 3, available: 1 }),
        })
    }

    fn not_scoreboard() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), result: || Ok(image(false)) })
    }
}

impl CaptureSource for FakeCapture {
    fn capture(&self, _monitor_index: usize) -> Result<CapturedImage, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.result)()
    }
}

struct FakeClient {
    calls: AtomicUsize,
    reply: Result<String, fn() -> AnalysisError>,
    /// When set, each call waits for one permit before answering.
    gate: Option<Semaphore>,
    delay: Option<Duration>,
}

impl FakeClient {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), reply: Ok(text.to_string()), gate: None, delay: None })
    }

    fn failing(error: fn() -> AnalysisError) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), reply: Err(error), gate: None, delay: None })
    }

    fn gated(text: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply: Ok(text.to_string()),
            gate: Some(Semaphore::new(0)),
            delay: None,
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply: Ok(MODEL_TEXT.to_string()),
            gate: None,
            delay: Some(delay),
        })
    }

    fn release_one(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }
}

#[async_trait]
impl AnalysisClient for FakeClient {
    fn name(&self) -> &str {
        "fake"
    }

    async fn analyze(&self, _image: &CapturedImage, _instruction: &str, _max_tokens: u32) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("semaphore closed").forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(make) => Err(make()),
        }
    }
}

#[derive(Clone)]
struct RecordingSink {
    name: &'static str,
    fail: bool,
    seen: Arc<Mutex<Vec<Report>>>,
}

impl RecordingSink {
    fn new(name: &'static str) -> Self {
        Self { name, fail: false, seen: Arc::default() }
    }

    fn failing(name: &'static str) -> Self {
        Self { fail: true, ..Self::new(name) }
    }

    fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl DeliverySink for RecordingSink {
    fn name(&self) -> &'static str {
        self.name
    }

    fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
        self.seen.lock().unwrap().push(report.clone());
        if self.fail {
            Err(DeliveryError::Clipboard("clipboard is locked by another process".into()))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn fixed_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 10, 19, 20, 15, 30).unwrap()
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        capture_monitor: 1,
        max_tokens: 16_000,
        analysis_timeout: Duration::from_secs(5),
        require_scoreboard: false,
    }
}

fn orchestrator(
    capture: Arc<FakeCapture>,
    client: Arc<FakeClient>,
    sinks: Vec<Box<dyn DeliverySink>>,
    settings: PipelineSettings,
) -> Orchestrator {
    Orchestrator::new(capture, client, sinks, settings).with_clock(Arc::new(fixed_time))
}

fn three_sinks() -> (RecordingSink, RecordingSink, RecordingSink, Vec<Box<dyn DeliverySink>>) {
    let console = RecordingSink::new("console");
    let clipboard = RecordingSink::new("clipboard");
    let notification = RecordingSink::new("notification");
    let sinks: Vec<Box<dyn DeliverySink>> = vec![
        Box::new(console.clone()),
        Box::new(clipboard.clone()),
        Box::new(notification.clone()),
    ];
    (console, clipboard, notification, sinks)
}

async fn wait_for_state(orch: &Orchestrator, state: PipelineState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while orch.state() != state {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("pipeline never reached the expected state");
}

// ── Happy path ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn hotkey_run_delivers_same_report_to_every_sink() {
    let capture = FakeCapture::ok();
    let client = FakeClient::replying(MODEL_TEXT);
    let (console, clipboard, notification, sinks) = three_sinks();
    let orch = orchestrator(capture.clone(), client.clone(), sinks, settings());

    let outcome = orch.handle(CaptureRequest::Hotkey).await;

    let PipelineOutcome::Delivered(report) = &outcome else {
        panic!("expected Delivered, got {outcome:?}");
    };
    assert!(report.all_succeeded());
    assert_eq!(capture.calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    assert_eq!((console.count(), clipboard.count(), notification.count()), (1, 1, 1));

    let delivered = console.seen.lock().unwrap()[0].clone();
    assert_eq!(delivered, clipboard.seen.lock().unwrap()[0]);
    assert_eq!(delivered.headline.body, "King's Row: VICTORY - copied to clipboard.");
    assert!(delivered.text.contains("TANK | Owl#1234 | 22 | 9 | 4 | 11,204 | 0 | 18,990"));
    assert!(delivered.text.contains("SUPPORT | Nest#42 | 8 | 17 | 3 | 3,100 | 12,450 | -"));
    assert!(!orch.in_flight());
    assert_eq!(orch.state(), PipelineState::Idle);
}

// ── Lock discipline ───────────────────────────────────────────────────────────

#[tokio::test]
async fn second_request_is_dropped_while_first_is_running() {
    let capture = FakeCapture::ok();
    let client = FakeClient::gated(MODEL_TEXT);
    let (console, _, _, sinks) = three_sinks();
    let orch = Arc::new(orchestrator(capture.clone(), client.clone(), sinks, settings()));

    let first = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.handle(CaptureRequest::Hotkey).await }
    });
    wait_for_state(&orch, PipelineState::Analyzing).await;
    assert!(orch.in_flight());

    let second = orch.handle(CaptureRequest::Hotkey).await;
    assert!(matches!(second, PipelineOutcome::Dropped));
    assert_eq!(capture.calls.load(Ordering::SeqCst), 1, "dropped request must not capture");

    client.release_one();
    let first = first.await.unwrap();
    assert!(matches!(first, PipelineOutcome::Delivered(_)));
    assert!(!orch.in_flight());

    // Released: the next request is admitted.
    client.release_one();
    let third = orch.handle(CaptureRequest::Hotkey).await;
    assert!(matches!(third, PipelineOutcome::Delivered(_)));
    assert_eq!(capture.calls.load(Ordering::SeqCst), 2);
    assert_eq!(console.count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dispatch_admits_on_caller_and_runs_in_background() {
    let client = FakeClient::gated(MODEL_TEXT);
    let (console, _, _, sinks) = three_sinks();
    let orch = Arc::new(orchestrator(FakeCapture::ok(), client.clone(), sinks, settings()));
    let runtime = tokio::runtime::Handle::current();

    assert!(orch.dispatch(&runtime, CaptureRequest::Hotkey));
    assert!(orch.in_flight(), "lock must be taken before dispatch returns");
    assert!(!orch.dispatch(&runtime, CaptureRequest::Hotkey));

    client.release_one();
    tokio::time::timeout(Duration::from_secs(5), async {
        while orch.in_flight() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("background run never finished");
    assert_eq!(console.count(), 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

// ── Failure paths ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn capture_failure_invokes_no_sink_and_releases_lock() {
    let client = FakeClient::replying(MODEL_TEXT);
    let (console, clipboard, notification, sinks) = three_sinks();
    let orch = orchestrator(FakeCapture::failing(), client.clone(), sinks, settings());

    let outcome = orch.handle(CaptureRequest::Hotkey).await;

    assert!(matches!(
        outcome,
        PipelineOutcome::CaptureFailed(CaptureError::InvalidMonitor { index: 3, available: 1 })
    ));
    assert_eq!(outcome.exit_status(), 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    assert_eq!((console.count(), clipboard.count(), notification.count()), (0, 0, 0));
    assert!(!orch.in_flight());
    assert_eq!(orch.state(), PipelineState::Idle);
}

#[tokio::test]
async fn analysis_errors_end_the_run_without_delivery() {
    let cases: [fn() -> AnalysisError; 4] = [
        || AnalysisError::Auth("HTTP 401".into()),
        || AnalysisError::RateLimit("HTTP 429".into()),
        || AnalysisError::Network("connection reset".into()),
        || AnalysisError::Malformed("no text block".into()),
    ];
    for make in cases {
        let (console, _, _, sinks) = three_sinks();
        let orch = orchestrator(FakeCapture::ok(), FakeClient::failing(make), sinks, settings());
        let outcome = orch.handle(CaptureRequest::Hotkey).await;
        assert!(matches!(outcome, PipelineOutcome::AnalysisFailed(_)), "{outcome:?}");
        assert_eq!(console.count(), 0);
        assert!(!orch.in_flight());
    }
}

#[tokio::test]
async fn blank_and_rejected_model_answers_are_analysis_errors() {
    for (text, expect_not_scoreboard) in [
        ("   \n", false),
        ("NOT_OW2_TAB: This does not appear to be an Overwatch 2 scoreboard screenshot.", true),
    ] {
        let (console, _, _, sinks) = three_sinks();
        let orch = orchestrator(FakeCapture::ok(), FakeClient::replying(text), sinks, settings());
        match orch.handle(CaptureRequest::Hotkey).await {
            PipelineOutcome::AnalysisFailed(AnalysisError::NotScoreboard) => assert!(expect_not_scoreboard),
            PipelineOutcome::AnalysisFailed(AnalysisError::Malformed(_)) => assert!(!expect_not_scoreboard),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(console.count(), 0);
    }
}

#[tokio::test]
async fn slow_analysis_times_out_and_frees_the_lock() {
    let (console, _, _, sinks) = three_sinks();
    let mut short = settings();
    short.analysis_timeout = Duration::from_millis(50);
    let orch = orchestrator(FakeCapture::ok(), FakeClient::slow(Duration::from_secs(30)), sinks, short);

    let outcome = orch.handle(CaptureRequest::Hotkey).await;

    match outcome {
        PipelineOutcome::AnalysisFailed(AnalysisError::Timeout(after)) => {
            assert_eq!(after, Duration::from_millis(50))
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(console.count(), 0);
    assert!(!orch.in_flight());
}

#[tokio::test]
async fn scoreboard_heuristic_gates_only_when_required() {
    let client = FakeClient::replying(MODEL_TEXT);
    let (_, _, _, sinks) = three_sinks();
    let mut strict = settings();
    strict.require_scoreboard = true;
    let orch = orchestrator(FakeCapture::not_scoreboard(), client.clone(), sinks, strict);
    assert!(matches!(
        orch.handle(CaptureRequest::Hotkey).await,
        PipelineOutcome::CaptureFailed(CaptureError::NotScoreboard)
    ));
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);

    let (console, _, _, sinks) = three_sinks();
    let lenient = orchestrator(FakeCapture::not_scoreboard(), client.clone(), sinks, settings());
    assert!(matches!(lenient.handle(CaptureRequest::Hotkey).await, PipelineOutcome::Delivered(_)));
    assert_eq!(console.count(), 1);
}

// ── Formatting and delivery ───────────────────────────────────────────────────

#[tokio::test]
async fn response_without_hero_stats_still_renders_every_section() {
    let (console, _, _, sinks) = three_sinks();
    let orch = orchestrator(FakeCapture::ok(), FakeClient::replying(MODEL_TEXT_NO_HEROES), sinks, settings());

    assert!(matches!(orch.handle(CaptureRequest::Hotkey).await, PipelineOutcome::Delivered(_)));

    let text = console.seen.lock().unwrap()[0].text.clone();
    assert!(text.contains("MAP: Busan\nTIME: 6:03\nMODE: Control\nRESULT: DEFEAT\n"));
    assert!(text.contains("=== YOUR TEAM ===\nRole | Player | Eliminations | Assists | Deaths | Damage | Healing | Mitigated\nDPS | Owl#1234 | 10 | 1 | 7 | 5,400 | 0 | 0\n"));
    assert!(text.contains("TANK | Wall#1 | 19 | 6 | 2 | 8,002 | 0 | 22,310\n"));
    assert!(text.contains("HERO STATS:\n(none)\n"));
}

#[tokio::test]
async fn failing_clipboard_does_not_stop_other_sinks() {
    let console = RecordingSink::new("console");
    let clipboard = RecordingSink::failing("clipboard");
    let notification = RecordingSink::new("notification");
    let sinks: Vec<Box<dyn DeliverySink>> = vec![
        Box::new(console.clone()),
        Box::new(clipboard.clone()),
        Box::new(notification.clone()),
    ];
    let orch = orchestrator(FakeCapture::ok(), FakeClient::replying(MODEL_TEXT), sinks, settings());

    let outcome = orch.handle(CaptureRequest::Hotkey).await;

    let PipelineOutcome::Delivered(report) = &outcome else {
        panic!("expected Delivered, got {outcome:?}");
    };
    assert_eq!((console.count(), clipboard.count(), notification.count()), (1, 1, 1));
    assert!(report.succeeded("console"));
    assert!(report.succeeded("notification"));
    assert!(!report.succeeded("clipboard"));
    let failed: Vec<_> = report.failures().map(|o| o.sink).collect();
    assert_eq!(failed, vec!["clipboard"]);
    assert_eq!(outcome.exit_status(), 0);
}

// ── File input ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn file_input_prints_exact_report_and_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("scoreboard.png");
    image::RgbaImage::from_pixel(320, 180, image::Rgba([24, 26, 46, 255]))
        .save(&path)
        .unwrap();

    let buffer = SharedBuffer::default();
    let capture = FakeCapture::ok();
    let sinks: Vec<Box<dyn DeliverySink>> = vec![Box::new(ConsoleSink::new(Box::new(buffer.clone())))];
    let orch = orchestrator(capture.clone(), FakeClient::replying(MODEL_TEXT), sinks, settings());

    let outcome = orch.handle(CaptureRequest::FileInput { path }).await;

    assert_eq!(outcome.exit_status(), 0);
    assert_eq!(capture.calls.load(Ordering::SeqCst), 0, "file input must not touch the screen");
    let expected = format!("{}\n", format_report(&parse_analysis(MODEL_TEXT, fixed_time())));
    assert_eq!(buffer.contents(), expected);
    assert!(expected.starts_with(
        "============================================================\n  OVERWATCH LOOKER -- Analysis at 2026-10-19 20:15:30\n"
    ));
    assert!(expected.contains("Reinhardt - Charge Kills: 3; Fire Strike Kills: 5; Damage Blocked: 18,990\n"));
}

#[tokio::test]
async fn missing_file_is_a_capture_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (console, _, _, sinks) = three_sinks();
    let client = FakeClient::replying(MODEL_TEXT);
    let orch = orchestrator(FakeCapture::ok(), client.clone(), sinks, settings());

    let outcome = orch
        .handle(CaptureRequest::FileInput { path: dir.path().join("nope.png") })
        .await;

    assert!(matches!(outcome, PipelineOutcome::CaptureFailed(CaptureError::UnreadableFile { .. })));
    assert_ne!(outcome.exit_status(), 0);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    assert_eq!(console.count(), 0);
}
