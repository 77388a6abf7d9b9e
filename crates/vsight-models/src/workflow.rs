//! Upload / process / analyze workflow state machine.
//!
//! ```text
//! Idle --FileSelected--> FileSelected --UploadRequested--> Uploading
//! Uploading --UploadSucceeded--> Processing      Uploading --UploadFailed--> Idle
//! Processing --PollActive--> Ready               Processing --PollFailed|PollError--> Idle
//! Ready --AnalysisRequested--> Analyzing --AnalysisFinished|AnalysisFailed--> Ready
//! ```
//!
//! `Ready` is stable: analyses can be repeated against the same file. Selecting
//! a new file from `Ready` discards the current handle. `Reset` returns to
//! `Idle` from anywhere; `Cancelled` does so from the two in-flight phases.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Phase of a session's workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    #[default]
    Idle,
    FileSelected,
    Uploading,
    Processing,
    Ready,
    Analyzing,
}

/// Something that happened to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    FileSelected,
    UploadRequested,
    UploadSucceeded,
    UploadFailed,
    PollActive,
    PollFailed,
    PollError,
    Cancelled,
    AnalysisRequested,
    AnalysisFinished,
    AnalysisFailed,
    Reset,
}

/// An event that is not allowed in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Event {event:?} is not valid in phase {from}")]
pub struct InvalidTransition {
    pub from: WorkflowPhase,
    pub event: WorkflowEvent,
}

impl WorkflowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPhase::Idle => "idle",
            WorkflowPhase::FileSelected => "file_selected",
            WorkflowPhase::Uploading => "uploading",
            WorkflowPhase::Processing => "processing",
            WorkflowPhase::Ready => "ready",
            WorkflowPhase::Analyzing => "analyzing",
        }
    }

    /// Compute the phase that follows `event`.
    pub fn apply(self, event: WorkflowEvent) -> Result<WorkflowPhase, InvalidTransition> {
        use WorkflowEvent as E;
        use WorkflowPhase as P;

        let next = match (self, event) {
            (_, E::Reset) => P::Idle,
            (P::Idle | P::FileSelected | P::Ready, E::FileSelected) => P::FileSelected,
            (P::FileSelected, E::UploadRequested) => P::Uploading,
            (P::Uploading, E::UploadSucceeded) => P::Processing,
            (P::Uploading, E::UploadFailed) => P::Idle,
            (P::Processing, E::PollActive) => P::Ready,
            (P::Processing, E::PollFailed | E::PollError) => P::Idle,
            (P::Uploading | P::Processing, E::Cancelled) => P::Idle,
            (P::Ready, E::AnalysisRequested) => P::Analyzing,
            (P::Analyzing, E::AnalysisFinished | E::AnalysisFailed) => P::Ready,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
