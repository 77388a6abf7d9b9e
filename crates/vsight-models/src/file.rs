//! Remote file handle models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state of an uploaded file, as reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    /// The service is still ingesting the video
    #[default]
    Processing,
    /// The file can be referenced by analysis requests
    Active,
    /// The service gave up on the file
    Failed,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
        }
    }

    /// Check if this is a terminal state (polling stops here).
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Active | FileState::Failed)
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The remote service's reference to an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileHandle {
    /// URI used to reference the file from analysis requests
    pub uri: String,
    /// Resource name (`files/<id>`) used to query state
    pub resource_name: String,
    /// Last state reported by the service
    #[serde(default)]
    pub state: FileState,
}

impl FileHandle {
    pub fn new(uri: impl Into<String>, resource_name: impl Into<String>, state: FileState) -> Self {
        Self {
            uri: uri.into(),
            resource_name: resource_name.into(),
            state,
        }
    }

    /// Replace the local state with the value the server reported.
    pub fn with_state(&self, state: FileState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Whether analysis requests may reference this file.
    pub fn is_ready(&self) -> bool {
        self.state == FileState::Active
    }
}

/// A negotiated resumable upload session.
///
/// Consumed by value when the bytes are transmitted; a session is never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// URL the file bytes are posted to
    pub session_url: String,
    /// Byte length announced when the session was opened
    pub declared_len: u64,
    /// Content type announced when the session was opened
    pub mime_type: String,
}
