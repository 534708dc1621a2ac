//! Transport over the system HID stack.

use std::ffi::CString;
use std::sync::{Mutex, MutexGuard};

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info};

use super::transport::{DeviceInfo, Transport, TransportHandle};
use crate::{Error, Result};

/// Upper bound for a blocking read.
const READ_TIMEOUT_MS: i32 = 50;

/// Production transport backed by `hidapi`.
pub struct HidTransport {
    api: Mutex<HidApi>,
}

impl HidTransport {
    pub fn new() -> Result<Self> {
        Ok(Self {
            api: Mutex::new(HidApi::new()?),
        })
    }

    fn api(&self) -> Result<MutexGuard<'_, HidApi>> {
        self.api
            .lock()
            .map_err(|_| Error::Transport("HID context lock poisoned".to_string()))
    }
}

impl Transport for HidTransport {
    type Handle = HidHandle;

    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<DeviceInfo>> {
        let mut api = self.api()?;
        api.refresh_devices()?;

        let devices: Vec<_> = api
            .device_list()
            .filter(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .map(|d| DeviceInfo {
                path: d.path().to_string_lossy().into_owned(),
                manufacturer: d.manufacturer_string().map(str::to_owned),
                product: d.product_string().map(str::to_owned),
                serial_number: d.serial_number().map(str::to_owned),
            })
            .collect();

        debug!(
            "Found {} device(s) for {:04X}:{:04X}",
            devices.len(),
            vendor_id,
            product_id
        );
        Ok(devices)
    }

    fn open(&self, path: &str) -> Result<HidHandle> {
        let failed = || Error::OpenFailed {
            path: path.to_string(),
        };
        let c_path = CString::new(path).map_err(|_| failed())?;

        let device = self.api()?.open_path(&c_path).map_err(|e| {
            debug!("Failed to open device: {}", e);
            failed()
        })?;

        info!("HID device opened at path: {}", path);
        Ok(HidHandle {
            device: Some(device),
            nonblocking: false,
        })
    }
}

/// An open HID device.
pub struct HidHandle {
    device: Option<HidDevice>,
    nonblocking: bool,
}

impl HidHandle {
    fn device(&self) -> Result<&HidDevice> {
        self.device.as_ref().ok_or(Error::NotOpen)
    }
}

impl TransportHandle for HidHandle {
    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        self.device()?.set_blocking_mode(!nonblocking)?;
        self.nonblocking = nonblocking;
        Ok(())
    }

    fn write(&mut self, report: &[u8]) -> Result<()> {
        self.device()?.write(report)?;
        Ok(())
    }

    fn read(&mut self, max_len: usize) -> Result<Option<Vec<u8>>> {
        let timeout = if self.nonblocking { 0 } else { READ_TIMEOUT_MS };
        let mut buffer = vec![0u8; max_len];
        let len = self.device()?.read_timeout(&mut buffer, timeout)?;
        if len == 0 {
            return Ok(None);
        }
        buffer.truncate(len);
        Ok(Some(buffer))
    }

    fn close(&mut self) -> Result<()> {
        if self.device.take().is_some() {
            debug!("HID device closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{PRODUCT_ID, VENDOR_ID};

    // Hardware tests are skipped by default
    #[test]
    #[ignore]
    fn test_enumerate() {
        let transport = HidTransport::new().unwrap();
        let devices = transport.enumerate(VENDOR_ID, PRODUCT_ID).unwrap();
        assert!(!devices.is_empty());
    }
}
