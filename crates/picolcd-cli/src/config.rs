//! Configuration management.

use anyhow::{Context, Result};
use picolcd_hw::{Font, FontSet, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Device selection
    #[serde(default)]
    pub device: DeviceConfig,

    /// Session settings passed to the library
    #[serde(default)]
    pub session: SessionConfig,

    /// Watch loop poll interval in milliseconds
    #[serde(default = "default_poll")]
    pub poll_interval_ms: u64,

    /// Font overrides
    #[serde(default)]
    pub fonts: FontConfig,
}

/// Device selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device path or "auto" for the first enumerated panel
    #[serde(default = "default_device")]
    pub path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: default_device(),
        }
    }
}

/// Paths to font description files. Unset fonts use the built-in ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontConfig {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
}

fn default_poll() -> u64 {
    50
}

fn default_device() -> String {
    "auto".to_string()
}

impl Config {
    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Whether a specific device path was requested.
    pub fn device_path(&self) -> Option<&str> {
        if self.device.path.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(&self.device.path)
        }
    }

    /// Builds the fonts used for text drawing.
    pub fn font_set(&self) -> Result<FontSet> {
        let load = |path: &Option<PathBuf>, fallback: fn() -> Arc<Font>| -> Result<Arc<Font>> {
            match path {
                Some(path) => {
                    let font = Font::load(path)
                        .with_context(|| format!("Failed to load font {}", path.display()))?;
                    Ok(Arc::new(font))
                }
                None => Ok(fallback()),
            }
        };

        Ok(FontSet {
            regular: load(&self.fonts.regular, Font::regular)?,
            bold: load(&self.fonts.bold, Font::bold)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            session: SessionConfig::default(),
            poll_interval_ms: default_poll(),
            fonts: FontConfig::default(),
        }
    }
}
