//! Request/response logger.
//!
//! Per exchange: `START → LOGGED_INPUT → HANDLING → LOGGED_OUTPUT → DONE`.
//! The handler's result is returned unchanged whether or not either entry
//! made it to the sink.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RequestLogConfig;
use crate::journal::entry::{Capture, Captured, Direction, Exchange, LogEntry};
use crate::journal::sink::{LogSink, LogSinkUnavailable};
use crate::observability::{metrics, ErrorSource, OperationalErrors};

pub struct RequestLogger {
    sink: Arc<dyn LogSink>,
    errors: Arc<OperationalErrors>,
    append_timeout: Duration,
    max_body_bytes: usize,
    read_limit: usize,
    enabled: bool,
}

impl RequestLogger {
    pub fn new(sink: Arc<dyn LogSink>, errors: Arc<OperationalErrors>, config: &RequestLogConfig) -> Self {
        Self {
            sink,
            errors,
            append_timeout: config.append_timeout(),
            max_body_bytes: config.max_body_bytes,
            read_limit: usize::MAX,
            enabled: config.enabled,
        }
    }

    /// Cap on request bytes read before the handler runs.
    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.read_limit = limit;
        self
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Largest body kept in one entry.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn read_limit(&self) -> usize {
        self.read_limit
    }

    /// Journal an exchange around `handler`.
    ///
    /// The input entry is appended before the handler is polled and the
    /// output entry after it completes, capturing either the value or the
    /// error. Bodies longer than `max_body_bytes` are cut and marked in the
    /// entry only. The sink is only locked while a single entry is written.
    pub async fn around<T, E, Fut>(&self, exchange: &Exchange, request: Capture, handler: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Captured,
        E: Captured,
    {
        let request = request.truncated(self.max_body_bytes);
        self.record(LogEntry::new(Direction::Input, exchange, request)).await;

        let outcome = handler.await;

        let output = match &outcome {
            Ok(value) => value.capture(),
            Err(error) => error.capture(),
        };
        let output = output.truncated(self.max_body_bytes);
        self.record(LogEntry::new(Direction::Output, exchange, output)).await;

        outcome
    }

    /// Append one entry, reporting failure to the operational error channel.
    pub async fn record(&self, entry: LogEntry) {
        let direction = entry.direction.as_str();
        let appended = match tokio::time::timeout(self.append_timeout, self.sink.append(&entry)).await {
            Ok(result) => result,
            Err(_) => Err(LogSinkUnavailable::Timeout(self.append_timeout)),
        };

        match appended {
            Ok(()) => metrics::record_log_entry(direction),
            Err(e) => {
                metrics::record_log_sink_failure();
                self.errors.report(ErrorSource::LogSink, &e);
            }
        }
    }
}
