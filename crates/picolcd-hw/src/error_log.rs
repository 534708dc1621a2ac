//! Rolling log of recoverable protocol errors.

use std::collections::VecDeque;
use std::time::SystemTime;
use tracing::warn;

/// Number of entries kept.
pub const ERROR_LOG_CAPACITY: usize = 100;

/// One recorded error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub code: u32,
    pub message: String,
    pub at: SystemTime,
}

/// Keeps the most recent [`ERROR_LOG_CAPACITY`] errors, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: VecDeque<ErrorEntry>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error and emits it as a warning.
    pub fn record(&mut self, code: u32, message: impl Into<String>) {
        let message = message.into();
        warn!("Encountered error ({:08x}) {}", code, message);

        self.entries.push_back(ErrorEntry {
            code,
            message,
            at: SystemTime::now(),
        });
        while self.entries.len() > ERROR_LOG_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ErrorEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
