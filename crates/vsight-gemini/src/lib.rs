//! Gemini Files API client for video analysis.
//!
//! This crate provides:
//! - Resumable upload (session start + single finalize request)
//! - Processing-state polling with cancellation and optional bounds
//! - Per-mode analysis prompts and `generateContent` requests
//! - Response parsing with raw-text fallback
//! - A per-session workflow context tying the steps together

pub mod analyze;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod poll;
pub mod prompt;
pub mod response;
pub mod upload;
pub mod workflow;

pub use analyze::AnalysisOutcome;
pub use client::GeminiClient;
pub use config::GeminiConfig;
pub use error::{GeminiError, GeminiResult};
pub use poll::PollPolicy;
pub use prompt::{AnalysisPrompt, GenerateContentRequest};
pub use response::{parse_generate_response, ParsedResponse};
pub use upload::VideoUpload;
pub use workflow::{VideoWorkflow, WorkflowStatus};

pub use tokio_util::sync::CancellationToken;
