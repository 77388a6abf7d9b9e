//! Processing-state polling.
//!
//! After finalize the service ingests the video asynchronously. The poller
//! re-reads the file resource until it leaves `PROCESSING`; the local handle
//! only ever takes the state the server reports.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vsight_models::{FileHandle, FileState};

use crate::client::{error_details, transport_message, GeminiClient};
use crate::error::{GeminiError, GeminiResult};
use crate::metrics::record_poll_attempt;

/// How often and for how long to poll.
///
/// The defaults poll every 2 seconds with no upper bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep before each status check
    pub interval: Duration,
    /// Give up once this much time has passed
    pub timeout: Option<Duration>,
    /// Give up after this many status checks
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: None,
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    /// Poll at a fixed interval with no bounds.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Status response; the service answers in either of two shapes.
///
/// Variants are tried in order: wrapped first, then bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileStatusEnvelope {
    Wrapped { file: FileStatus },
    Bare(FileStatus),
}

#[derive(Debug, Deserialize)]
struct FileStatus {
    state: FileState,
}

impl FileStatusEnvelope {
    fn state(&self) -> FileState {
        match self {
            FileStatusEnvelope::Wrapped { file } => file.state,
            FileStatusEnvelope::Bare(status) => status.state,
        }
    }
}

/// Decode a status body into the reported state.
pub(crate) fn parse_file_status(body: &str) -> GeminiResult<FileState> {
    serde_json::from_str::<FileStatusEnvelope>(body)
        .map(|envelope| envelope.state())
        .map_err(|_| GeminiError::poll(None, format!("unrecognized file status response: {}", body.trim())))
}

impl GeminiClient {
    /// Read the current state of a file resource once.
    pub async fn fetch_file_state(&self, resource_name: &str) -> GeminiResult<FileState> {
        let url = self.config.file_url(resource_name);

        self.execute_request("file_status", async {
            let response = self
                .authorized(self.http.get(&url))
                .send()
                .await
                .map_err(|e| GeminiError::poll(None, transport_message(e)))?;

            if !response.status().is_success() {
                let (status, message) = error_details(response).await;
                return Err(GeminiError::poll(Some(status), message));
            }

            let body = response
                .text()
                .await
                .map_err(|e| GeminiError::poll(None, transport_message(e)))?;

            parse_file_status(&body)
        })
        .await
    }

    /// Poll until the file is `ACTIVE`.
    pub async fn wait_until_active(
        &self,
        handle: FileHandle,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> GeminiResult<FileHandle> {
        self.wait_until_active_with(handle, policy, cancel, |_, _| {}).await
    }

    /// Poll until the file is `ACTIVE`, reporting every observation.
    ///
    /// The interval is slept before each check and at least one check is made
    /// even if the handle already claims a terminal state. A transport or HTTP
    /// failure on any check aborts immediately; `FAILED` is terminal.
    pub async fn wait_until_active_with<F>(
        &self,
        handle: FileHandle,
        policy: &PollPolicy,
        cancel: &CancellationToken,
        mut on_attempt: F,
    ) -> GeminiResult<FileHandle>
    where
        F: FnMut(u32, FileState),
    {
        let started = Instant::now();
        let mut current = handle;
        let mut attempts: u32 = 0;

        loop {
            if let Some(max) = policy.max_attempts {
                if attempts >= max {
                    warn!(resource_name = %current.resource_name, attempts, "Poll attempt limit reached");
                    return Err(GeminiError::PollTimeout { attempts });
                }
            }
            if let Some(timeout) = policy.timeout {
                if started.elapsed() >= timeout {
                    warn!(resource_name = %current.resource_name, attempts, "Poll deadline exceeded");
                    return Err(GeminiError::PollTimeout { attempts });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(GeminiError::Cancelled),
                _ = tokio::time::sleep(policy.interval) => {}
            }

            attempts += 1;
            let state = tokio::select! {
                _ = cancel.cancelled() => return Err(GeminiError::Cancelled),
                state = self.fetch_file_state(&current.resource_name) => state?,
            };

            record_poll_attempt(state.as_str());
            on_attempt(attempts, state);
            debug!(resource_name = %current.resource_name, attempts, %state, "Polled file state");

            current = current.with_state(state);
            if state.is_terminal() {
                break;
            }
        }

        match current.state {
            FileState::Active => {
                info!(resource_name = %current.resource_name, attempts, "File is active");
                Ok(current)
            }
            _ => Err(GeminiError::ProcessingFailed(current.resource_name)),
        }
    }
}
