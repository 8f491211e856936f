//! Global input listener using low-level Windows hooks (`WH_KEYBOARD_LL` +
//! `WH_MOUSE_LL`).
//!
//! The hooks run on a dedicated OS thread with its own message pump, so they
//! fire even when a full-screen game has focus. Hook callbacks only forward
//! raw events into a channel; a second thread owns the [`TriggerDetector`]
//! and decides when the gesture completed. Both threads exit when
//! [`ListenerHandle::stop`] is called.
//!
//! On non-Windows platforms [`start`] returns [`ListenerError::Unsupported`].

use std::sync::mpsc;
use std::thread::JoinHandle;

use super::detector::{InputEvent, TriggerDetector};
use super::keys::{KeyCode, PointerButton};
use crate::pipeline::CaptureRequest;

/// Everything the listener needs to recognise the gesture.
#[derive(Debug, Clone)]
pub struct TriggerSettings {
    pub modifier: KeyCode,
    pub button: PointerButton,
    /// Lowercase executable name that must own the foreground window.
    /// `None` accepts any foreground process.
    pub foreground_exe: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Global input hooks are only available on Windows")]
    Unsupported,

    #[error("Input listener is already running")]
    AlreadyRunning,

    #[error("Failed to install input hooks: {0}")]
    HookInstall(String),

    #[error("Failed to spawn listener thread: {0}")]
    Spawn(String),
}

/// Messages delivered to the detector thread.
#[derive(Debug)]
pub(crate) enum HookMessage {
    #[cfg_attr(not(windows), allow(dead_code))]
    Input(InputEvent),
    Shutdown,
}

/// A handle to the running listener threads.
pub struct ListenerHandle {
    #[cfg(windows)]
    pump: JoinHandle<()>,
    #[cfg(windows)]
    pump_thread_id: u32,
    detector: JoinHandle<()>,
    tx: mpsc::Sender<HookMessage>,
}

impl ListenerHandle {
    /// Unhooks, stops both threads and waits for them to exit.
    pub fn stop(self) {
        #[cfg(windows)]
        {
            imp::post_quit(self.pump_thread_id);
            let _ = self.pump.join();
        }
        let _ = self.tx.send(HookMessage::Shutdown);
        let _ = self.detector.join();
        log::info!("[TRIGGER] Listener stopped");
    }
}

/// Starts the hook and detector threads.
///
/// `on_capture` runs on the detector thread for every completed gesture
/// whose foreground check passes. It must return quickly; heavy work belongs
/// on the pipeline worker.
pub fn start<F>(settings: TriggerSettings, on_capture: F) -> Result<ListenerHandle, ListenerError>
where
    F: FnMut(CaptureRequest) + Send + 'static,
{
    #[cfg(not(windows))]
    {
        let _ = (settings, on_capture);
        Err(ListenerError::Unsupported)
    }

    #[cfg(windows)]
    {
        let (tx, rx) = mpsc::channel::<HookMessage>();
        imp::install_sender(tx.clone())?;

        let detector = TriggerDetector::new(settings.modifier, settings.button);
        let foreground_exe = settings.foreground_exe.clone();
        let detector_thread = std::thread::Builder::new()
            .name("trigger-detector".into())
            .spawn(move || {
                run_detector(rx, detector, move || foreground_matches(foreground_exe.as_deref()), on_capture)
            })
            .map_err(|e| ListenerError::Spawn(e.to_string()))?;

        let (id_tx, id_rx) = mpsc::sync_channel::<Result<u32, String>>(1);
        let pump = std::thread::Builder::new()
            .name("input-hook-pump".into())
            .spawn(move || imp::run_message_pump(id_tx))
            .map_err(|e| ListenerError::Spawn(e.to_string()))?;

        let pump_thread_id = match id_rx.recv() {
            Ok(Ok(id)) => id,
            Ok(Err(reason)) => {
                let _ = tx.send(HookMessage::Shutdown);
                let _ = detector_thread.join();
                let _ = pump.join();
                return Err(ListenerError::HookInstall(reason));
            }
            Err(_) => {
                let _ = tx.send(HookMessage::Shutdown);
                let _ = detector_thread.join();
                return Err(ListenerError::HookInstall("hook thread exited early".into()));
            }
        };

        log::info!(
            "[TRIGGER] Listening for {:?} + {} (foreground: {})",
            settings.modifier,
            settings.button,
            settings.foreground_exe.as_deref().unwrap_or("any")
        );

        Ok(ListenerHandle {
            pump,
            pump_thread_id,
            detector: detector_thread,
            tx,
        })
    }
}

/// Detector loop: feeds every event into `detector` and hands completed
/// gestures to `on_capture` when `foreground_ok` agrees.
///
/// Returns on [`HookMessage::Shutdown`] or when all senders are gone.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn run_detector<G, F>(
    rx: mpsc::Receiver<HookMessage>,
    mut detector: TriggerDetector,
    foreground_ok: G,
    mut on_capture: F,
) where
    G: Fn() -> bool,
    F: FnMut(CaptureRequest),
{
    while let Ok(message) = rx.recv() {
        let event = match message {
            HookMessage::Input(event) => event,
            HookMessage::Shutdown => break,
        };
        if let Some(request) = detector.feed(event) {
            if foreground_ok() {
                on_capture(request);
            } else {
                log::debug!("[TRIGGER] Gesture ignored: game window not in foreground");
            }
        }
    }
}

/// True when `expected` is unset or names the foreground process.
#[cfg_attr(not(windows), allow(dead_code))]
fn foreground_matches(expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    #[cfg(windows)]
    {
        imp::foreground_exe().is_some_and(|exe| exe.eq_ignore_ascii_case(expected))
    }
    #[cfg(not(windows))]
    {
        let _ = expected;
        true
    }
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use std::sync::mpsc;
    use std::sync::OnceLock;

    use windows::core::PWSTR;
    use windows::Win32::Foundation::{CloseHandle, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::Threading::{
        GetCurrentThreadId, OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetForegroundWindow, GetMessageW,
        GetWindowThreadProcessId, PostThreadMessageW, SetWindowsHookExW, UnhookWindowsHookEx,
        HHOOK, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYDOWN,
        WM_KEYUP, WM_LBUTTONDOWN, WM_MBUTTONDOWN, WM_QUIT, WM_RBUTTONDOWN, WM_SYSKEYDOWN,
        WM_SYSKEYUP, WM_XBUTTONDOWN,
    };

    use super::{HookMessage, ListenerError};
    use crate::trigger::detector::InputEvent;
    use crate::trigger::keys::{KeyCode, PointerButton};

    const XBUTTON1: u32 = 0x0001;
    const XBUTTON2: u32 = 0x0002;

    /// Channel the hook callbacks forward raw events into. Set once by
    /// [`install_sender`]; hook procedures cannot capture state.
    static HOOK_TX: OnceLock<mpsc::Sender<HookMessage>> = OnceLock::new();

    pub fn install_sender(tx: mpsc::Sender<HookMessage>) -> Result<(), ListenerError> {
        HOOK_TX.set(tx).map_err(|_| ListenerError::AlreadyRunning)
    }

    fn forward(event: InputEvent) {
        if let Some(tx) = HOOK_TX.get() {
            let _ = tx.send(HookMessage::Input(event));
        }
    }

    unsafe extern "system" fn keyboard_proc(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
        if n_code >= 0 {
            let kb = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
            let key = KeyCode(kb.vkCode);
            match w_param.0 as u32 {
                WM_KEYDOWN | WM_SYSKEYDOWN => forward(InputEvent::key_down(key)),
                WM_KEYUP | WM_SYSKEYUP => forward(InputEvent::key_up(key)),
                _ => {}
            }
        }
        CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
    }

    unsafe extern "system" fn mouse_proc(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
        if n_code >= 0 {
            let button = match w_param.0 as u32 {
                WM_LBUTTONDOWN => Some(PointerButton::Left),
                WM_RBUTTONDOWN => Some(PointerButton::Right),
                WM_MBUTTONDOWN => Some(PointerButton::Middle),
                WM_XBUTTONDOWN => {
                    let ms = &*(l_param.0 as *const MSLLHOOKSTRUCT);
                    match (ms.mouseData >> 16) & 0xFFFF {
                        XBUTTON1 => Some(PointerButton::Side1),
                        XBUTTON2 => Some(PointerButton::Side2),
                        _ => None,
                    }
                }
                _ => None,
            };
            if let Some(button) = button {
                forward(InputEvent::button_down(button));
            }
        }
        CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
    }

    /// Installs both hooks, reports the thread ID (or the failure) to
    /// `id_tx`, then pumps messages until `WM_QUIT`.
    pub fn run_message_pump(id_tx: mpsc::SyncSender<Result<u32, String>>) {
        unsafe {
            let keyboard = match SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), HINSTANCE::default(), 0) {
                Ok(h) => h,
                Err(e) => {
                    let _ = id_tx.send(Err(format!("keyboard hook: {e}")));
                    return;
                }
            };
            let mouse = match SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_proc), HINSTANCE::default(), 0) {
                Ok(h) => h,
                Err(e) => {
                    let _ = UnhookWindowsHookEx(keyboard);
                    let _ = id_tx.send(Err(format!("mouse hook: {e}")));
                    return;
                }
            };

            let _ = id_tx.send(Ok(GetCurrentThreadId()));
            drop(id_tx);

            let mut msg = MSG::default();
            // GetMessageW: >0 = message, 0 = WM_QUIT, <0 = error.
            while GetMessageW(&mut msg, HWND::default(), 0, 0).0 > 0 {
                DispatchMessageW(&msg);
            }

            let _ = UnhookWindowsHookEx(mouse);
            let _ = UnhookWindowsHookEx(keyboard);
            log::debug!("[TRIGGER] Hook thread exited");
        }
    }

    /// Posts `WM_QUIT` to `thread_id`, ending its `GetMessageW` loop.
    pub fn post_quit(thread_id: u32) {
        unsafe {
            let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
    }

    /// Lowercase file name of the executable owning the foreground window.
    pub fn foreground_exe() -> Option<String> {
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd == HWND::default() {
                return None;
            }
            let mut pid = 0u32;
            GetWindowThreadProcessId(hwnd, Some(&mut pid as *mut u32));
            if pid == 0 {
                return None;
            }

            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
            let mut buf = [0u16; 260];
            let mut size = buf.len() as u32;
            let queried = QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, PWSTR(buf.as_mut_ptr()), &mut size);
            let _ = CloseHandle(handle);
            queried.ok()?;

            let path = String::from_utf16_lossy(&buf[..size as usize]);
            path.rsplit('\\').next().map(|name| name.to_lowercase())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_detector(
        foreground_ok: bool,
    ) -> (mpsc::Sender<HookMessage>, std::thread::JoinHandle<Vec<CaptureRequest>>) {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            run_detector(
                rx,
                TriggerDetector::new(KeyCode::TAB, PointerButton::Side1),
                move || foreground_ok,
                |req| seen.push(req),
            );
            seen
        });
        (tx, handle)
    }

    #[test]
    fn detector_loop_forwards_completed_gestures() {
        let (tx, handle) = spawn_detector(true);
        tx.send(HookMessage::Input(InputEvent::key_down(KeyCode::TAB))).unwrap();
        tx.send(HookMessage::Input(InputEvent::button_down(PointerButton::Side1))).unwrap();
        tx.send(HookMessage::Shutdown).unwrap();
        assert_eq!(handle.join().unwrap(), vec![CaptureRequest::Hotkey]);
    }

    #[test]
    fn detector_loop_drops_gesture_when_game_not_focused() {
        let (tx, handle) = spawn_detector(false);
        tx.send(HookMessage::Input(InputEvent::key_down(KeyCode::TAB))).unwrap();
        tx.send(HookMessage::Input(InputEvent::button_down(PointerButton::Side1))).unwrap();
        tx.send(HookMessage::Shutdown).unwrap();
        assert!(handle.join().unwrap().is_empty());
    }

    #[test]
    fn detector_loop_exits_when_senders_dropped() {
        let (tx, handle) = spawn_detector(true);
        drop(tx);
        assert!(handle.join().unwrap().is_empty());
    }

    #[test]
    fn unset_foreground_filter_always_matches() {
        assert!(foreground_matches(None));
    }

    #[cfg(not(windows))]
    #[test]
    fn start_is_unsupported_off_windows() {
        let settings = TriggerSettings {
            modifier: KeyCode::TAB,
            button: PointerButton::Side1,
            foreground_exe: None,
        };
        assert!(matches!(start(settings, |_| {}), Err(ListenerError::Unsupported)));
    }
}
