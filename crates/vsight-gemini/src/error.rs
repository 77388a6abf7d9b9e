//! Gemini client error types.

use thiserror::Error;

use vsight_models::{InvalidTransition, UnsupportedFormat};

/// Result type for Gemini client operations.
pub type GeminiResult<T> = Result<T, GeminiError>;

/// Errors that can occur while uploading, polling or analyzing.
///
/// None of these are retried automatically; the user re-triggers the action.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormat),

    #[error("Failed to start upload: {message}")]
    UploadInit { status: Option<u16>, message: String },

    #[error("Failed to transmit video: {message}")]
    UploadTransmit { status: Option<u16>, message: String },

    #[error("Unexpected upload response: {0}")]
    UploadResponseFormat(String),

    #[error("Failed to check file status: {message}")]
    Poll { status: Option<u16>, message: String },

    #[error("Video processing failed for {0}")]
    ProcessingFailed(String),

    #[error("Video still processing after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Analysis failed: {message}")]
    AnalysisRequest { status: Option<u16>, message: String },

    #[error("Failed to parse response: {0}")]
    ResponseParse(String),

    #[error("File is not ready for analysis (state {0})")]
    NotReady(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeminiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn upload_init(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::UploadInit {
            status,
            message: msg.into(),
        }
    }

    pub fn upload_transmit(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::UploadTransmit {
            status,
            message: msg.into(),
        }
    }

    pub fn poll(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Poll {
            status,
            message: msg.into(),
        }
    }

    pub fn analysis_request(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::AnalysisRequest {
            status,
            message: msg.into(),
        }
    }

    /// HTTP status returned by the remote service, when the failure had one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            GeminiError::UploadInit { status, .. }
            | GeminiError::UploadTransmit { status, .. }
            | GeminiError::Poll { status, .. }
            | GeminiError::AnalysisRequest { status, .. } => *status,
            _ => None,
        }
    }

    /// True for errors that come from the remote service or the network.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            GeminiError::UploadInit { .. }
                | GeminiError::UploadTransmit { .. }
                | GeminiError::UploadResponseFormat(_)
                | GeminiError::Poll { .. }
                | GeminiError::ProcessingFailed(_)
                | GeminiError::PollTimeout { .. }
                | GeminiError::AnalysisRequest { .. }
        )
    }

    /// Short machine-readable code for API responses and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            GeminiError::Config(_) => "config_error",
            GeminiError::UnsupportedFormat(_) => "unsupported_format",
            GeminiError::UploadInit { .. } => "upload_init_error",
            GeminiError::UploadTransmit { .. } => "upload_transmit_error",
            GeminiError::UploadResponseFormat(_) => "upload_response_format_error",
            GeminiError::Poll { .. } => "poll_error",
            GeminiError::ProcessingFailed(_) => "processing_failed",
            GeminiError::PollTimeout { .. } => "poll_timeout",
            GeminiError::Cancelled => "cancelled",
            GeminiError::AnalysisRequest { .. } => "analysis_request_error",
            GeminiError::ResponseParse(_) => "response_parse_error",
            GeminiError::NotReady(_) => "not_ready",
            GeminiError::InvalidTransition(_) => "invalid_transition",
            GeminiError::Io(_) => "io_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_getter() {
        assert_eq!(GeminiError::upload_init(Some(403), "denied").http_status(), Some(403));
        assert_eq!(GeminiError::poll(None, "connection reset").http_status(), None);
        assert_eq!(GeminiError::Cancelled.http_status(), None);
    }

    #[test]
    fn test_upstream_classification() {
        assert!(GeminiError::ProcessingFailed("files/a".into()).is_upstream());
        assert!(GeminiError::analysis_request(Some(500), "boom").is_upstream());
        assert!(!GeminiError::ResponseParse("eof".into()).is_upstream());
        assert!(!GeminiError::config_error("missing").is_upstream());
    }

    #[test]
    fn test_messages_do_not_leak_structure() {
        let err = GeminiError::analysis_request(Some(400), "HTTP 400: bad request");
        assert_eq!(err.to_string(), "Analysis failed: HTTP 400: bad request");
        assert_eq!(err.code(), "analysis_request_error");
    }
}
