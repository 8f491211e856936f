//! Cross-monitor toast notification.
//!
//! Geometry is pure ([`toast_position`]); the window itself is a plain
//! Win32 popup. Each toast gets its own thread and message loop, and closes
//! itself with a timer, so `deliver` never waits for dismissal. A short
//! rising chime plays when the window appears.

use std::time::Duration;

use super::{DeliveryError, DeliverySink};
use crate::capture::MonitorRect;
use crate::report::Report;

pub const TOAST_WIDTH: u32 = 360;
pub const TOAST_HEIGHT: u32 = 80;
const MARGIN_RIGHT: i32 = 20;
const MARGIN_BOTTOM: i32 = 120;

/// (frequency Hz, length ms): C5 then E5.
pub const CHIME_NOTES: [(u32, u32); 2] = [(523, 120), (659, 180)];

/// Shows the report headline on a chosen monitor.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(not(windows), allow(dead_code))]
pub struct ToastSink {
    monitor_index: usize,
    duration: Duration,
}

impl ToastSink {
    pub fn new(monitor_index: usize, duration: Duration) -> Self {
        Self { monitor_index, duration }
    }
}

impl DeliverySink for ToastSink {
    fn name(&self) -> &'static str {
        "notification"
    }

    #[cfg(windows)]
    fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
        use crate::capture::{monitor_rect, CaptureError};

        let rect = monitor_rect(self.monitor_index).map_err(|e| match e {
            CaptureError::InvalidMonitor { index, available } => {
                DeliveryError::NoSuchMonitor { index, available }
            }
            other => DeliveryError::Window(other.to_string()),
        })?;
        let (x, y) = toast_position(rect);
        imp::show(&report.headline.title, &report.headline.body, x, y, self.duration)?;
        log::info!(
            "[DELIVERY] Toast on monitor {} at ({}, {}) for {}ms",
            self.monitor_index,
            x,
            y,
            self.duration.as_millis()
        );
        Ok(())
    }

    #[cfg(not(windows))]
    fn deliver(&self, _report: &Report) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unsupported("toast notification"))
    }
}

/// Top-left corner of the toast: bottom-right of `monitor`, inset 20 px from
/// the right edge and 120 px from the bottom.
pub fn toast_position(monitor: MonitorRect) -> (i32, i32) {
    let x = monitor.x + monitor.width as i32 - TOAST_WIDTH as i32 - MARGIN_RIGHT;
    let y = monitor.y + monitor.height as i32 - TOAST_HEIGHT as i32 - MARGIN_BOTTOM;
    (x, y)
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use std::cell::RefCell;
    use std::sync::{mpsc, Once};
    use std::time::Duration;

    use windows::core::{w, PCWSTR};
    use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, CreateSolidBrush, DrawTextW, EndPaint, SetBkMode, SetTextColor, DT_END_ELLIPSIS,
        DT_LEFT, DT_SINGLELINE, DT_WORDBREAK, PAINTSTRUCT, TRANSPARENT,
    };
    use windows::Win32::System::Diagnostics::Debug::Beep;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect, GetMessageW,
        PostQuitMessage, RegisterClassW, SetTimer, ShowWindow, TranslateMessage, HMENU, MSG,
        SW_SHOWNOACTIVATE, WM_DESTROY, WM_PAINT, WM_TIMER, WNDCLASSW, WS_EX_NOACTIVATE,
        WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
    };

    use super::{DeliveryError, CHIME_NOTES, TOAST_HEIGHT, TOAST_WIDTH};

    const CLASS_NAME: PCWSTR = w!("OverwatchLookerToast");
    const DISMISS_TIMER: usize = 1;

    // COLORREF is 0x00BBGGRR.
    const BACKGROUND: COLORREF = COLORREF(0x002e_1a1a);
    const TITLE_COLOR: COLORREF = COLORREF(0x00ff_9933);
    const BODY_COLOR: COLORREF = COLORREF(0x00cc_cccc);

    static REGISTER: Once = Once::new();

    thread_local! {
        /// Title and body for the toast owned by this thread.
        static TEXT: RefCell<(Vec<u16>, Vec<u16>)> = const { RefCell::new((Vec::new(), Vec::new())) };
    }

    /// Spawns the toast thread and waits until its window exists.
    pub fn show(title: &str, body: &str, x: i32, y: i32, duration: Duration) -> Result<(), DeliveryError> {
        let title: Vec<u16> = title.encode_utf16().collect();
        let body: Vec<u16> = body.encode_utf16().collect();
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        std::thread::Builder::new()
            .name("toast".into())
            .spawn(move || run_toast(title, body, x, y, millis, ready_tx))
            .map_err(|e| DeliveryError::Window(format!("spawning toast thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(DeliveryError::Window(reason)),
            Err(_) => Err(DeliveryError::Window("toast thread exited early".into())),
        }
    }

    fn run_toast(
        title: Vec<u16>,
        body: Vec<u16>,
        x: i32,
        y: i32,
        millis: u32,
        ready_tx: mpsc::SyncSender<Result<(), String>>,
    ) {
        TEXT.with(|text| *text.borrow_mut() = (title, body));

        unsafe {
            let instance: HINSTANCE = match GetModuleHandleW(PCWSTR::null()) {
                Ok(module) => module.into(),
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("module handle: {e}")));
                    return;
                }
            };

            REGISTER.call_once(|| {
                let class = WNDCLASSW {
                    lpfnWndProc: Some(window_proc),
                    hInstance: instance,
                    lpszClassName: CLASS_NAME,
                    hbrBackground: CreateSolidBrush(BACKGROUND),
                    ..Default::default()
                };
                if RegisterClassW(&class) == 0 {
                    log::warn!("[DELIVERY] RegisterClassW failed for toast window class");
                }
            });

            let hwnd = match CreateWindowExW(
                WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
                CLASS_NAME,
                w!("OverwatchLooker"),
                WS_POPUP,
                x,
                y,
                TOAST_WIDTH as i32,
                TOAST_HEIGHT as i32,
                HWND::default(),
                HMENU::default(),
                instance,
                None,
            ) {
                Ok(hwnd) => hwnd,
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("CreateWindowExW: {e}")));
                    return;
                }
            };

            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
            SetTimer(hwnd, DISMISS_TIMER, millis, None);
            play_chime();
            let _ = ready_tx.send(Ok(()));
            drop(ready_tx);

            let mut msg = MSG::default();
            while GetMessageW(&mut msg, HWND::default(), 0, 0).0 > 0 {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        log::debug!("[DELIVERY] Toast dismissed");
    }

    /// Beep blocks for the note length, so the chime gets its own thread.
    fn play_chime() {
        let spawned = std::thread::Builder::new().name("toast-chime".into()).spawn(|| {
            for (freq, millis) in CHIME_NOTES {
                if let Err(e) = unsafe { Beep(freq, millis) } {
                    log::debug!("[DELIVERY] Chime failed: {}", e);
                    return;
                }
            }
        });
        if let Err(e) = spawned {
            log::debug!("[DELIVERY] Chime thread not started: {}", e);
        }
    }

    unsafe extern "system" fn window_proc(hwnd: HWND, msg: u32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
        match msg {
            WM_PAINT => {
                paint(hwnd);
                LRESULT(0)
            }
            WM_TIMER if w_param.0 == DISMISS_TIMER => {
                let _ = DestroyWindow(hwnd);
                LRESULT(0)
            }
            WM_DESTROY => {
                PostQuitMessage(0);
                LRESULT(0)
            }
            _ => DefWindowProcW(hwnd, msg, w_param, l_param),
        }
    }

    unsafe fn paint(hwnd: HWND) {
        let mut ps = PAINTSTRUCT::default();
        let hdc = BeginPaint(hwnd, &mut ps);

        let mut client = RECT::default();
        let _ = GetClientRect(hwnd, &mut client);
        SetBkMode(hdc, TRANSPARENT);

        TEXT.with(|text| {
            let (title, body) = &mut *text.borrow_mut();

            let mut title_rect = RECT { left: 10, top: 8, right: client.right - 10, bottom: 30 };
            SetTextColor(hdc, TITLE_COLOR);
            DrawTextW(hdc, title, &mut title_rect, DT_LEFT | DT_SINGLELINE | DT_END_ELLIPSIS);

            let mut body_rect = RECT { left: 10, top: 32, right: client.right - 10, bottom: client.bottom - 8 };
            SetTextColor(hdc, BODY_COLOR);
            DrawTextW(hdc, body, &mut body_rect, DT_LEFT | DT_WORDBREAK);
        });

        let _ = EndPaint(hwnd, &ps);
    }
}
