//! Error types for the picoLCD hardware library.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when building fonts, drawing or talking to a panel.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed font or glyph description.
    #[error("Invalid font description: {0}")]
    Validation(String),

    /// Canvas coordinate or size misuse on a mutating call.
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    /// The session already holds an open transport handle.
    #[error("Device is already open")]
    AlreadyOpen,

    /// The session has no open transport handle.
    #[error("Device is not open")]
    NotOpen,

    /// The transport could not open the device.
    #[error("Failed to open device at {path}")]
    OpenFailed { path: String },

    /// A mode switch did not complete before its deadline.
    #[error("Mode switch timed out after {0:?}")]
    Timeout(Duration),

    /// USB HID communication error.
    #[error("USB HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Non-HID transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Font file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Font file could not be parsed.
    #[error("Font parse error: {0}")]
    FontParse(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn position(msg: impl Into<String>) -> Self {
        Error::InvalidPosition(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
