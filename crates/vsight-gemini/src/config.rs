//! Client configuration.

use std::fmt;
use std::time::Duration;

use crate::error::{GeminiError, GeminiResult};
use crate::poll::PollPolicy;

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default API version path segment.
pub const DEFAULT_API_VERSION: &str = "v1beta";
/// Default model for `generateContent`.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini client configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key, sent as the `key` query parameter
    pub api_key: String,
    /// Service root, without trailing slash
    pub base_url: String,
    /// API version path segment
    pub api_version: String,
    /// Model used for analysis
    pub model: String,
    /// Processing-state polling behavior
    pub poll: PollPolicy,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .field("poll", &self.poll)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl GeminiConfig {
    /// Create a config with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll: PollPolicy::default(),
            request_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Point the client at another service root (used by tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Create config from environment variables.
    ///
    /// A missing or empty `GEMINI_API_KEY` is a configuration error; callers
    /// treat it as fatal at startup.
    pub fn from_env() -> GeminiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GeminiError::config_error("GEMINI_API_KEY not set"))?;

        if api_key.trim().is_empty() {
            return Err(GeminiError::config_error("GEMINI_API_KEY cannot be empty"));
        }

        let poll = PollPolicy {
            interval: Duration::from_millis(env_parse("GEMINI_POLL_INTERVAL_MS").unwrap_or(2000)),
            timeout: env_parse("GEMINI_POLL_TIMEOUT_SECS").map(Duration::from_secs),
            max_attempts: env_parse("GEMINI_POLL_MAX_ATTEMPTS"),
        };

        let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let parsed = url::Url::parse(&base_url)
            .map_err(|e| GeminiError::config_error(format!("GEMINI_BASE_URL is not a valid URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GeminiError::config_error("GEMINI_BASE_URL must use http or https"));
        }

        let config = Self::new(api_key.trim())
            .with_base_url(base_url)
            .with_model(std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()))
            .with_poll_policy(poll);

        Ok(Self {
            api_version: std::env::var("GEMINI_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            request_timeout: Duration::from_secs(env_parse("GEMINI_REQUEST_TIMEOUT_SECS").unwrap_or(300)),
            connect_timeout: Duration::from_secs(env_parse("GEMINI_CONNECT_TIMEOUT_SECS").unwrap_or(10)),
            ..config
        })
    }

    /// `POST` target that opens a resumable upload.
    pub(crate) fn upload_start_url(&self) -> String {
        format!("{}/upload/{}/files", self.base_url, self.api_version)
    }

    /// `GET` target for a file resource (`files/<id>`).
    pub(crate) fn file_url(&self, resource_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.api_version,
            resource_name.trim_start_matches('/')
        )
    }

    /// `POST` target for content generation.
    pub(crate) fn generate_url(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, self.api_version, self.model
        )
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
