//! picoLCD 256x64 device support.
//!
//! Provides the wire protocol, the session state machine and the HID
//! transport for the 256x64 monochrome panel.

mod config;
mod hid;
mod keys;
mod mode;
mod session;
mod transport;

pub mod protocol;

pub use config::SessionConfig;
pub use hid::{HidHandle, HidTransport};
pub use keys::{KeyEvent, KeyTable};
pub use mode::Mode;
pub use protocol::{FlashType, SplashSize, Version};
pub use session::PicoLcd;
pub use transport::{DeviceInfo, Transport, TransportHandle};

#[cfg(test)]
pub(crate) mod mock;

/// USB vendor ID of the panel
pub const VENDOR_ID: u16 = 0x04D8;
/// USB product ID of the panel
pub const PRODUCT_ID: u16 = 0xC002;

/// Display width in pixels
pub const SCREEN_W: i32 = 256;
/// Display height in pixels
pub const SCREEN_H: i32 = 64;

/// Contrast applied on open unless configured otherwise
pub const DEFAULT_CONTRAST: u8 = 0xE5;
/// Backlight level applied on open unless configured otherwise
pub const DEFAULT_BACKLIGHT: u8 = 0x7F;
