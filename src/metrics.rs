//! Metrics instrumentation for capture-dns.
//!
//! All metrics are prefixed with `capture_dns.`

use metrics::{counter, histogram};
use std::time::Instant;

/// Record a DNS query.
pub fn record_query(record_type: &str, result: QueryResult, duration: std::time::Duration) {
    let result_str = match result {
        QueryResult::Override => "override",
        QueryResult::Default => "default",
        QueryResult::NoAnswer => "no_answer",
        QueryResult::Error => "error",
    };

    counter!("capture_dns.query.count", "type" => record_type.to_string(), "result" => result_str)
        .increment(1);
    histogram!("capture_dns.query.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Query result type for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryResult {
    /// Answered from a stored override.
    Override,
    /// Answered with the built-in default.
    Default,
    /// Replied without an answer record.
    NoAnswer,
    /// Resolution failed.
    Error,
}

/// Record an override rotation that advanced stored state.
pub fn record_rotation(record_type: &str) {
    counter!("capture_dns.rotation.count", "type" => record_type.to_string()).increment(1);
}

/// Record a rotation write that lost a race and was retried.
pub fn record_rotation_conflict() {
    counter!("capture_dns.rotation.conflict.count").increment(1);
}

/// Record a stored override value that could not be used.
pub fn record_malformed_override(record_type: &str) {
    counter!("capture_dns.override.malformed.count", "type" => record_type.to_string())
        .increment(1);
}

/// Record a query log entry written.
pub fn record_log_written() {
    counter!("capture_dns.log.written.count").increment(1);
}

/// Record a query that had no owner and was not logged.
pub fn record_log_skipped() {
    counter!("capture_dns.log.skipped.count").increment(1);
}

/// Record a failure to write a query log entry.
pub fn record_log_error() {
    counter!("capture_dns.log.error.count").increment(1);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
