//! Gemini REST client.
//!
//! Thin wrapper over `reqwest` shared by the upload, poll and analysis
//! operations:
//! - HTTP client tuning (pooling, timeouts, user agent)
//! - API key attached as the `key` query parameter, never logged
//! - Observability (tracing spans, request metrics)

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response};
use tracing::{info_span, Instrument};

use crate::config::GeminiConfig;
use crate::error::{GeminiError, GeminiResult};
use crate::metrics::record_request;

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    pub(crate) http: Client,
    pub(crate) config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(config: GeminiConfig) -> GeminiResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vsight-gemini/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GeminiError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GeminiResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Attach the API key to a request against the service root.
    pub(crate) fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.query(&[("key", self.config.api_key.as_str())])
    }

    /// Run one remote call inside a tracing span and record its metrics.
    pub(crate) async fn execute_request<T, F>(&self, operation: &str, fut: F) -> GeminiResult<T>
    where
        F: std::future::Future<Output = GeminiResult<T>>,
    {
        let span = info_span!("gemini_request", operation = %operation);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        record_request(operation, request_outcome(&result), latency_ms);

        result
    }
}

/// Metric label for a finished call: `success` or the error code.
pub(crate) fn request_outcome<T>(result: &GeminiResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.code(),
    }
}

/// Render a transport failure without the request URL (it carries the key).
pub(crate) fn transport_message(err: reqwest::Error) -> String {
    err.without_url().to_string()
}

/// Consume a non-success response into its status and a readable message.
pub(crate) async fn error_details(response: Response) -> (u16, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body.trim())
    };
    (status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_outcome_labels() {
        assert_eq!(request_outcome(&Ok(())), "success");
        let failed: GeminiResult<()> = Err(GeminiError::AnalysisRequest {
            status: Some(503),
            message: "overloaded".to_string(),
        });
        assert_eq!(request_outcome(&failed), "analysis_request_error");
        let cancelled: GeminiResult<()> = Err(GeminiError::Cancelled);
        assert_eq!(request_outcome(&cancelled), "cancelled");
    }

    #[test]
    fn test_client_keeps_config() {
        let client = GeminiClient::new(GeminiConfig::new("k").with_model("gemini-2.5-pro")).unwrap();
        assert_eq!(client.config().model, "gemini-2.5-pro");
    }
}
