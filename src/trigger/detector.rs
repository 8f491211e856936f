//! Compound-gesture detector: functional core.
//!
//! No OS dependencies: the listener feeds it events, tests feed it scripts.
//! The only state is whether the modifier key is currently held.

use std::time::Instant;

use super::keys::{KeyCode, PointerButton};
use crate::pipeline::CaptureRequest;

/// A low-level input event as reported by the OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown { key: KeyCode, at: Instant },
    KeyUp { key: KeyCode, at: Instant },
    PointerButtonDown { button: PointerButton, at: Instant },
}

impl InputEvent {
    pub fn key_down(key: KeyCode) -> Self {
        Self::KeyDown { key, at: Instant::now() }
    }

    pub fn key_up(key: KeyCode) -> Self {
        Self::KeyUp { key, at: Instant::now() }
    }

    pub fn button_down(button: PointerButton) -> Self {
        Self::PointerButtonDown { button, at: Instant::now() }
    }
}

/// Turns "modifier held + auxiliary button pressed" into a capture request.
///
/// `armed` is true only between a key-down and the matching key-up of the
/// modifier. Auto-repeated key-downs while held keep it armed; every button
/// press while armed emits one request.
#[derive(Debug)]
pub struct TriggerDetector {
    modifier: KeyCode,
    button: PointerButton,
    armed: bool,
}

impl TriggerDetector {
    pub fn new(modifier: KeyCode, button: PointerButton) -> Self {
        Self {
            modifier,
            button,
            armed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Consumes one event; returns a request when the gesture completes.
    pub fn feed(&mut self, event: InputEvent) -> Option<CaptureRequest> {
        match event {
            InputEvent::KeyDown { key, .. } if key == self.modifier => {
                self.armed = true;
                None
            }
            InputEvent::KeyUp { key, .. } if key == self.modifier => {
                self.armed = false;
                None
            }
            InputEvent::PointerButtonDown { button, .. } if button == self.button && self.armed => {
                log::debug!("[TRIGGER] Gesture completed ({button} while modifier held)");
                Some(CaptureRequest::Hotkey)
            }
            _ => None,
        }
    }
}
