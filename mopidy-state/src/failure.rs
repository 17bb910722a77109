//! Throttled logging of connectivity failures
//!
//! While a server is down every poll fails the same way. The first failure of
//! an operation since its last success is logged at `error`; repeats go to
//! `debug` until that operation succeeds again.

use std::collections::HashSet;

use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct FailureLog {
    failing: Mutex<HashSet<&'static str>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a connectivity failure of `operation`
    ///
    /// Returns `true` when this was the first failure since the last success.
    pub fn record_failure(
        &self,
        operation: &'static str,
        server: &str,
        error: &dyn std::fmt::Display,
    ) -> bool {
        let first = self.failing.lock().insert(operation);
        if first {
            tracing::error!("Failed to {} on Mopidy server at {}", operation, server);
        } else {
            tracing::debug!("Failed to {} on Mopidy server at {} (repeated)", operation, server);
        }
        tracing::debug!("Connection error details: {}", error);
        first
    }

    /// Reset the flag of `operation`
    pub fn record_success(&self, operation: &'static str) {
        if self.failing.lock().remove(operation) {
            tracing::info!("{} succeeded again", operation);
        }
    }

    pub fn is_failing(&self, operation: &'static str) -> bool {
        self.failing.lock().contains(operation)
    }
}
