//! picoLCD Graphic Hardware Library
//!
//! Drives the picoLCD 256x64 monochrome USB HID panel: a dirty-tracking
//! drawing canvas, bitmap fonts with word-wrapped layout, and the device
//! wire protocol with key/IR events and mode switching.

pub mod canvas;
pub mod device;
pub mod error;
pub mod error_log;
pub mod flags;
pub mod font;

pub use canvas::{Align, Bitmap, Canvas, FontSet, TextBoxStyle, TextStyle};
pub use device::{
    DeviceInfo, HidTransport, KeyEvent, Mode, PicoLcd, SessionConfig, Transport, TransportHandle,
    PRODUCT_ID, SCREEN_H, SCREEN_W, VENDOR_ID,
};
pub use error::{Error, Result};
pub use error_log::{ErrorEntry, ErrorLog};
pub use flags::{decompose_flags, Decomposed, FlagSet};
pub use font::{Font, FontDescription, Glyph, Measurement};
