//! Device operating modes.

use std::fmt;

use serde::Serialize;

/// Firmware mode. Changes only through `PicoLcd::switch_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Keyboard,
    Flasher,
    Switching,
    Unknown,
}

impl Mode {
    /// Mode reached by leaving this one.
    pub fn opposite(self) -> Mode {
        match self {
            Mode::Keyboard => Mode::Flasher,
            _ => Mode::Keyboard,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Keyboard => write!(f, "keyboard"),
            Mode::Flasher => write!(f, "flasher"),
            Mode::Switching => write!(f, "switching"),
            Mode::Unknown => write!(f, "unknown"),
        }
    }
}
