//! Shared data models for VSight.
//!
//! This crate provides Serde-serializable types for:
//! - Remote file handles and their processing state
//! - Analysis modes, results and per-mode report schemas
//! - The video format allow-list
//! - The per-session workflow state machine

pub mod analysis;
pub mod file;
pub mod format;
pub mod report;
pub mod session;
pub mod workflow;

// Re-export common types
pub use analysis::{AnalysisMode, AnalysisResult, UnknownAnalysisMode};
pub use file::{FileHandle, FileState, UploadSession};
pub use format::{UnsupportedFormat, VideoFormat};
pub use report::{AnomalyEvent, DetectedObject, KeyEvent, Level, ModeReport, PersonSighting, VideoSummary};
pub use session::SessionId;
pub use workflow::{InvalidTransition, WorkflowEvent, WorkflowPhase};
