//! Per-session settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{DEFAULT_BACKLIGHT, DEFAULT_CONTRAST};

/// Settings applied when a session opens and while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Contrast level set on every reset
    #[serde(default = "default_contrast")]
    pub contrast: u8,

    /// Backlight level set on every reset
    #[serde(default = "default_backlight")]
    pub backlight: u8,

    /// Deadline for a mode switch in milliseconds
    #[serde(default = "default_mode_switch_timeout")]
    pub mode_switch_timeout_ms: u64,

    /// Sleep between polls while waiting for the device, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl SessionConfig {
    pub fn mode_switch_timeout(&self) -> Duration {
        Duration::from_millis(self.mode_switch_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            contrast: default_contrast(),
            backlight: default_backlight(),
            mode_switch_timeout_ms: default_mode_switch_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_contrast() -> u8 {
    DEFAULT_CONTRAST
}

fn default_backlight() -> u8 {
    DEFAULT_BACKLIGHT
}

fn default_mode_switch_timeout() -> u64 {
    2500
}

fn default_poll_interval() -> u64 {
    10
}
