//! Trigger domain: public API.
//!
//! The gesture is "hold the modifier key, press the auxiliary pointer
//! button". `detector.rs` is the pure state machine, `listener.rs` wires it
//! to the OS input hooks.

mod detector;
mod keys;
mod listener;

pub use detector::{InputEvent, TriggerDetector};
pub use keys::{parse_key, KeyCode, PointerButton};
pub use listener::{start, ListenerError, ListenerHandle, TriggerSettings};
