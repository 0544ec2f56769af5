use crate::error::EventParseError;
use std::sync::{Mutex, PoisonError};

/// Where the stream loop reports contained, non-fatal conditions.
pub trait EventLog: Send + Sync {
    fn parse_failure(&self, failure: &EventParseError);

    /// Text still buffered when the stream ended. It is never parsed.
    fn discarded_tail(&self, _tail: &str) {}
}

/// Default sink: forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn parse_failure(&self, failure: &EventParseError) {
        tracing::warn!(error = %failure, payload = %failure.payload, "stream parse error");
    }

    fn discarded_tail(&self, tail: &str) {
        tracing::debug!(tail, "discarding incomplete trailing frame");
    }
}

/// Captures everything it is told, for assertions.
#[derive(Debug, Default)]
pub struct RecordingEventLog {
    parse_failures: Mutex<Vec<String>>,
    discarded_tails: Mutex<Vec<String>>,
}

impl RecordingEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads that failed to parse, in arrival order.
    pub fn parse_failures(&self) -> Vec<String> {
        self.parse_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn discarded_tails(&self) -> Vec<String> {
        self.discarded_tails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventLog for RecordingEventLog {
    fn parse_failure(&self, failure: &EventParseError) {
        self.parse_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure.payload.clone());
    }

    fn discarded_tail(&self, tail: &str) {
        self.discarded_tails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tail.to_string());
    }
}
