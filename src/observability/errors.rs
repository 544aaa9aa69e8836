//! Operational error channel.
//!
//! Failures that must not reach the client (a journal append that could not
//! be written, for instance) are reported here: logged at error level,
//! counted, and kept in a bounded ring for the admin endpoint.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Subsystem an operational error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    LogSink,
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSource::LogSink => f.write_str("log_sink"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationalError {
    pub at: DateTime<Utc>,
    pub source: ErrorSource,
    pub message: String,
}

#[derive(Debug)]
pub struct OperationalErrors {
    recent: Mutex<VecDeque<OperationalError>>,
    capacity: usize,
    total: AtomicU64,
}

impl OperationalErrors {
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            total: AtomicU64::new(0),
        }
    }

    fn recent_mut(&self) -> MutexGuard<'_, VecDeque<OperationalError>> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn report(&self, source: ErrorSource, error: &dyn fmt::Display) {
        let message = error.to_string();
        tracing::error!(source = %source, error = %message, "Operational error");

        self.total.fetch_add(1, Ordering::Relaxed);
        let mut recent = self.recent_mut();
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(OperationalError {
            at: Utc::now(),
            source,
            message,
        });
    }

    /// Kept errors, oldest first.
    pub fn recent(&self) -> Vec<OperationalError> {
        self.recent_mut().iter().cloned().collect()
    }

    /// Errors reported since startup, including ones evicted from the ring.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Default for OperationalErrors {
    fn default() -> Self {
        Self::new(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_keeps_newest() {
        let errors = OperationalErrors::new(2);
        errors.report(ErrorSource::LogSink, &"one");
        errors.report(ErrorSource::LogSink, &"two");
        errors.report(ErrorSource::LogSink, &"three");

        let messages: Vec<_> = errors.recent().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
        assert_eq!(errors.total(), 3);
    }
}
