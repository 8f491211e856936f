//! Key and pointer-button identifiers used by the trigger gesture.
//!
//! Key codes are Windows virtual-key codes so the low-level hook can hand
//! them over untouched. Names are what users write in `OWL_TRIGGER_KEY` /
//! `OWL_TRIGGER_BUTTON`.

use std::fmt;
use std::str::FromStr;

/// A Windows virtual-key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const TAB: KeyCode = KeyCode(0x09);
}

/// Converts a key name (e.g. `"Tab"`, `"F8"`, `"A"`) to a virtual-key code.
///
/// Supported keys:
/// - Named keys: `Tab`, `Space`, `Shift`, `Ctrl`/`Control`, `Alt`,
///   `CapsLock`, `Escape`/`Esc`, `Enter` (case-insensitive).
/// - Function keys `F1`–`F12`.
/// - ASCII letters `A`–`Z` and digits `0`–`9`.
///
/// Returns `None` for any unrecognised name.
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let upper = name.trim().to_uppercase();
    let vk = match upper.as_str() {
        "TAB" => 0x09,
        "ENTER" => 0x0D,
        "SHIFT" => 0x10,
        "CTRL" | "CONTROL" => 0x11,
        "ALT" => 0x12,
        "CAPSLOCK" => 0x14,
        "ESC" | "ESCAPE" => 0x1B,
        "SPACE" => 0x20,
        s if s.len() >= 2 && s.starts_with('F') => {
            let n: u32 = s[1..].parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            0x6F + n
        }
        s if s.len() == 1 => {
            let c = s.chars().next()?;
            if !c.is_ascii_alphanumeric() {
                return None;
            }
            // 'A'=0x41…'Z'=0x5A; '0'=0x30…'9'=0x39, identical to the VK values.
            c as u32
        }
        _ => return None,
    };
    Some(KeyCode(vk))
}

/// Pointer buttons the listener reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    /// First auxiliary ("back") button, `XBUTTON1`.
    Side1,
    /// Second auxiliary ("forward") button, `XBUTTON2`.
    Side2,
}

impl FromStr for PointerButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "middle" => Ok(Self::Middle),
            "side1" | "xbutton1" | "mouse4" | "back" => Ok(Self::Side1),
            "side2" | "xbutton2" | "mouse5" | "forward" => Ok(Self::Side2),
            other => Err(format!("unknown pointer button '{other}'")),
        }
    }
}

impl fmt::Display for PointerButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Middle => "Middle",
            Self::Side1 => "Side1",
            Self::Side2 => "Side2",
        };
        f.write_str(name)
    }
}
