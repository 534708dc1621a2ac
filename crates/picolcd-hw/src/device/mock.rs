//! In-memory transport for protocol tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::transport::{DeviceInfo, Transport, TransportHandle};
use crate::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub written: Vec<Vec<u8>>,
    pub inbound: VecDeque<Vec<u8>>,
    pub opened: usize,
    pub closed: usize,
    pub nonblocking: bool,
    pub fail_open: bool,
    pub fail_write: bool,
    pub fail_close: bool,
}

/// Records written reports and replays queued inbound reports.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn queue(&self, report: &[u8]) {
        self.state().inbound.push_back(report.to_vec());
    }

    /// Returns and forgets everything written so far.
    pub fn take_written(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state().written)
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn enumerate(&self, _vendor_id: u16, _product_id: u16) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo {
            path: "mock:0".to_string(),
            manufacturer: Some("mini-box.com".to_string()),
            product: Some("picoLCD 256x64".to_string()),
            serial_number: None,
        }])
    }

    fn open(&self, path: &str) -> Result<MockHandle> {
        let mut state = self.state();
        if state.fail_open {
            return Err(Error::OpenFailed {
                path: path.to_string(),
            });
        }
        state.opened += 1;
        Ok(MockHandle {
            state: self.state.clone(),
        })
    }
}

pub(crate) struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl TransportHandle for MockHandle {
    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        self.state().nonblocking = nonblocking;
        Ok(())
    }

    fn write(&mut self, report: &[u8]) -> Result<()> {
        let mut state = self.state();
        if state.fail_write {
            return Err(Error::Transport("write failed".to_string()));
        }
        state.written.push(report.to_vec());
        Ok(())
    }

    fn read(&mut self, max_len: usize) -> Result<Option<Vec<u8>>> {
        Ok(self.state().inbound.pop_front().map(|mut report| {
            report.truncate(max_len);
            report
        }))
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state();
        state.closed += 1;
        if state.fail_close {
            return Err(Error::Transport("close failed".to_string()));
        }
        Ok(())
    }
}
