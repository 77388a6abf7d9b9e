//! Per-session upload / process / analyze workflow.
//!
//! A [`VideoWorkflow`] is the explicit context for one user session: it owns
//! the single current [`FileHandle`], drives the phase machine from
//! `vsight_models::workflow`, and publishes a [`WorkflowStatus`] snapshot on a
//! watch channel so observers never wait on in-flight work.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vsight_models::{AnalysisMode, FileHandle, VideoFormat, WorkflowEvent, WorkflowPhase};

use crate::analyze::AnalysisOutcome;
use crate::client::GeminiClient;
use crate::error::{GeminiError, GeminiResult};
use crate::upload::VideoUpload;

/// Snapshot of a workflow, safe to hand to observers.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatus {
    pub phase: WorkflowPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<VideoFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileHandle>,
    /// Status checks made for the current upload
    pub poll_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self {
            phase: WorkflowPhase::Idle,
            display_name: None,
            format: None,
            file: None,
            poll_attempts: 0,
            last_error: None,
            error_code: None,
            updated_at: Utc::now(),
        }
    }
}

/// Workflow context for one session.
pub struct VideoWorkflow {
    client: GeminiClient,
    phase: WorkflowPhase,
    selection: Option<(String, VideoFormat)>,
    handle: Option<FileHandle>,
    status: watch::Sender<WorkflowStatus>,
}

impl VideoWorkflow {
    pub fn new(client: GeminiClient) -> Self {
        let (status, _) = watch::channel(WorkflowStatus::default());
        Self {
            client,
            phase: WorkflowPhase::Idle,
            selection: None,
            handle: None,
            status,
        }
    }

    /// Receive status snapshots.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowStatus> {
        self.status.subscribe()
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    /// The current handle; only present once processing finished.
    pub fn handle(&self) -> Option<&FileHandle> {
        self.handle.as_ref()
    }

    /// Select a file for upload. Any previous handle is discarded.
    pub fn select_file(&mut self, display_name: impl Into<String>, format: VideoFormat) -> GeminiResult<()> {
        self.transition(WorkflowEvent::FileSelected)?;
        let display_name = display_name.into();
        self.selection = Some((display_name.clone(), format));
        self.handle = None;
        self.publish(|s| {
            s.display_name = Some(display_name);
            s.format = Some(format);
            s.file = None;
            s.poll_attempts = 0;
            s.last_error = None;
            s.error_code = None;
        });
        Ok(())
    }

    /// Upload `video` and wait until the service has processed it.
    ///
    /// Success leaves the workflow `Ready` with the active handle. Any failure
    /// (including cancellation) returns it to `Idle` with no handle.
    pub async fn upload_and_process(
        &mut self,
        video: VideoUpload,
        cancel: &CancellationToken,
    ) -> GeminiResult<FileHandle> {
        let selected = matches!(&self.selection, Some((name, format)) if *name == video.display_name && *format == video.format);
        if self.phase != WorkflowPhase::FileSelected || !selected {
            self.select_file(video.display_name.clone(), video.format)?;
        }
        self.transition(WorkflowEvent::UploadRequested)?;
        info!(display_name = %video.display_name, bytes = video.len(), "Uploading video");

        let uploaded = match self.client.upload(video, cancel).await {
            Ok(handle) => handle,
            Err(e) => {
                let event = if matches!(e, GeminiError::Cancelled) {
                    WorkflowEvent::Cancelled
                } else {
                    WorkflowEvent::UploadFailed
                };
                return Err(self.fail(event, e));
            }
        };

        self.transition(WorkflowEvent::UploadSucceeded)?;
        let pending = uploaded.clone();
        self.publish(|s| s.file = Some(pending));

        let policy = self.client.config().poll.clone();
        let status = &self.status;
        let polled = self
            .client
            .wait_until_active_with(uploaded, &policy, cancel, |attempts, state| {
                status.send_modify(|s| {
                    s.poll_attempts = attempts;
                    if let Some(file) = s.file.as_mut() {
                        file.state = state;
                    }
                    s.updated_at = Utc::now();
                });
            })
            .await;

        match polled {
            Ok(active) => {
                self.handle = Some(active.clone());
                self.transition(WorkflowEvent::PollActive)?;
                let file = active.clone();
                self.publish(|s| s.file = Some(file));
                Ok(active)
            }
            Err(e) => {
                let event = match e {
                    GeminiError::Cancelled => WorkflowEvent::Cancelled,
                    GeminiError::ProcessingFailed(_) => WorkflowEvent::PollFailed,
                    _ => WorkflowEvent::PollError,
                };
                Err(self.fail(event, e))
            }
        }
    }

    /// Run one analysis against the current file.
    ///
    /// Only allowed when `Ready`. Failures leave the workflow `Ready` with the
    /// handle intact so the user can retry.
    pub async fn analyze(&mut self, mode: AnalysisMode, focus: Option<&str>) -> GeminiResult<AnalysisOutcome> {
        let handle = match (&self.handle, self.phase) {
            (Some(handle), WorkflowPhase::Ready) if handle.is_ready() => handle.clone(),
            (Some(handle), _) => return Err(GeminiError::NotReady(handle.state.to_string())),
            (None, phase) => return Err(GeminiError::NotReady(phase.to_string())),
        };
        let mime_type = self
            .selection
            .as_ref()
            .map(|(_, format)| format.mime_type())
            .unwrap_or(VideoFormat::Mp4.mime_type());

        self.transition(WorkflowEvent::AnalysisRequested)?;
        info!(%mode, resource_name = %handle.resource_name, "Running analysis");

        let guard = AnalysisGuard {
            phase: &mut self.phase,
            status: &self.status,
            armed: true,
        };
        let result = self.client.analyze(&handle, mime_type, mode, focus).await;
        guard.disarm();

        match result {
            Ok(outcome) => {
                self.transition(WorkflowEvent::AnalysisFinished)?;
                self.publish(|s| {
                    s.last_error = None;
                    s.error_code = None;
                });
                Ok(outcome)
            }
            Err(e) => {
                warn!(%mode, error = %e, "Analysis failed");
                self.transition(WorkflowEvent::AnalysisFailed)?;
                let (message, code) = (e.to_string(), e.code().to_string());
                self.publish(|s| {
                    s.last_error = Some(message);
                    s.error_code = Some(code);
                });
                Err(e)
            }
        }
    }

    /// Return to `Idle`, discarding the file handle.
    pub fn reset(&mut self) {
        self.phase = WorkflowPhase::Idle;
        self.selection = None;
        self.handle = None;
        self.status.send_replace(WorkflowStatus::default());
    }

    fn transition(&mut self, event: WorkflowEvent) -> GeminiResult<()> {
        let next = self.phase.apply(event)?;
        self.phase = next;
        self.publish(|_| {});
        Ok(())
    }

    /// Move to `Idle` after a failed upload or poll and record the error.
    fn fail(&mut self, event: WorkflowEvent, err: GeminiError) -> GeminiError {
        warn!(phase = %self.phase, error = %err, "Upload workflow failed");
        self.phase = self.phase.apply(event).unwrap_or(WorkflowPhase::Idle);
        self.handle = None;
        let (message, code) = (err.to_string(), err.code().to_string());
        self.publish(|s| {
            s.file = None;
            s.last_error = Some(message);
            s.error_code = Some(code);
        });
        err
    }

    fn publish<F: FnOnce(&mut WorkflowStatus)>(&self, update: F) {
        let phase = self.phase;
        self.status.send_modify(|s| {
            s.phase = phase;
            update(s);
            s.updated_at = Utc::now();
        });
    }
}

/// Returns the workflow to `Ready` if an in-flight analysis is dropped.
struct AnalysisGuard<'a> {
    phase: &'a mut WorkflowPhase,
    status: &'a watch::Sender<WorkflowStatus>,
    armed: bool,
}

impl AnalysisGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AnalysisGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Analysis dropped before completion");
        *self.phase = self.phase.apply(WorkflowEvent::AnalysisFailed).unwrap_or(WorkflowPhase::Ready);
        let phase = *self.phase;
        self.status.send_modify(|s| {
            s.phase = phase;
            s.last_error = Some(GeminiError::Cancelled.to_string());
            s.error_code = Some(GeminiError::Cancelled.code().to_string());
            s.updated_at = Utc::now();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;

    fn workflow() -> VideoWorkflow {
        VideoWorkflow::new(GeminiClient::new(GeminiConfig::new("k").with_base_url("http://127.0.0.1:9")).unwrap())
    }

    #[test]
    fn test_select_file_publishes_status() {
        let mut wf = workflow();
        let rx = wf.subscribe();

        wf.select_file("gate.mp4", VideoFormat::Mp4).unwrap();

        let status = rx.borrow().clone();
        assert_eq!(status.phase, WorkflowPhase::FileSelected);
        assert_eq!(status.display_name.as_deref(), Some("gate.mp4"));
        assert!(status.file.is_none());
    }

    #[tokio::test]
    async fn test_analyze_without_file_is_not_ready() {
        let mut wf = workflow();
        let err = wf.analyze(AnalysisMode::ObjectDetection, None).await.unwrap_err();
        assert!(matches!(err, GeminiError::NotReady(_)));
        assert_eq!(wf.phase(), WorkflowPhase::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_upload_returns_to_idle() {
        let mut wf = workflow();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let video = VideoUpload::new("lobby.mov", vec![0; 8]).unwrap();
        let err = wf.upload_and_process(video, &cancel).await.unwrap_err();

        assert!(matches!(err, GeminiError::Cancelled));
        assert_eq!(wf.phase(), WorkflowPhase::Idle);
        assert!(wf.handle().is_none());
        assert_eq!(wf.subscribe().borrow().error_code.as_deref(), Some("cancelled"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut wf = workflow();
        wf.select_file("gate.mp4", VideoFormat::Mp4).unwrap();
        wf.reset();

        let status = wf.subscribe().borrow().clone();
        assert_eq!(status.phase, WorkflowPhase::Idle);
        assert!(status.display_name.is_none());
    }
}
