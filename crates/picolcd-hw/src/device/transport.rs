//! Transport seam between the protocol and the USB HID layer.

use serde::Serialize;

use crate::Result;

/// An enumerated device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DeviceInfo {
    pub path: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

/// Finds and opens devices.
pub trait Transport {
    type Handle: TransportHandle;

    /// Lists matching devices in enumeration order.
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<DeviceInfo>>;

    /// Opens a device by path. Fails with `Error::OpenFailed`.
    fn open(&self, path: &str) -> Result<Self::Handle>;
}

/// An open device.
pub trait TransportHandle {
    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()>;

    /// Sends one report.
    fn write(&mut self, report: &[u8]) -> Result<()>;

    /// Returns the next pending report, if any. Never blocks for long.
    fn read(&mut self, max_len: usize) -> Result<Option<Vec<u8>>>;

    fn close(&mut self) -> Result<()>;
}
