//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vsight_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vsight_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vsight_http_requests_in_flight";

    // Session metrics
    pub const SESSIONS_ACTIVE: &str = "vsight_sessions_active";
    pub const SESSIONS_EVICTED_TOTAL: &str = "vsight_sessions_evicted_total";
    pub const UPLOADS_STARTED_TOTAL: &str = "vsight_uploads_started_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Update the live session gauge.
pub fn set_active_sessions(count: usize) {
    gauge!(names::SESSIONS_ACTIVE).set(count as f64);
}

/// Record sessions removed by the reaper.
pub fn record_sessions_evicted(count: usize) {
    counter!(names::SESSIONS_EVICTED_TOTAL).increment(count as u64);
}

/// Record an accepted upload.
pub fn record_upload_started(format: &str) {
    let labels = [("format", format.to_string())];
    counter!(names::UPLOADS_STARTED_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
///
/// Paths are labelled by route template (`/api/sessions/:id`) so session IDs
/// never become label values.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
