//! Gemini request metrics.
//!
//! Standardized metrics for monitoring calls to the remote service:
//! - Request counters by operation and outcome
//! - Latency histograms
//! - Poll attempt counters

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total Gemini requests by operation and outcome.
    pub const REQUESTS_TOTAL: &str = "vsight_gemini_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "vsight_gemini_latency_seconds";

    /// Processing-state checks by observed state.
    pub const POLL_ATTEMPTS_TOTAL: &str = "vsight_gemini_poll_attempts_total";

    /// Analyses by mode and outcome (structured / raw / error).
    pub const ANALYSES_TOTAL: &str = "vsight_gemini_analyses_total";
}

/// Record metrics for a completed request.
pub fn record_request(operation: &str, outcome: &str, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record one processing-state observation.
pub fn record_poll_attempt(state: &str) {
    counter!(names::POLL_ATTEMPTS_TOTAL, "state" => state.to_string()).increment(1);
}

/// Record the outcome of an analysis.
pub fn record_analysis(mode: &str, outcome: &str) {
    counter!(
        names::ANALYSES_TOTAL,
        "mode" => mode.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.contains("requests"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
        assert!(names::POLL_ATTEMPTS_TOTAL.starts_with("vsight_"));
    }
}
