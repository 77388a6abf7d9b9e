//! Analysis modes and results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of analysis requested for an uploaded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Unusual events and safety hazards
    AnomalyDetection,
    /// Main objects with counts and timestamps
    ObjectDetection,
    /// Individuals that look unauthorized or suspicious
    UnknownPersonDetection,
    /// Summary plus key events, optionally narrowed by focus text
    Summarization,
}

impl AnalysisMode {
    /// All modes in presentation order.
    pub const ALL: [AnalysisMode; 4] = [
        AnalysisMode::AnomalyDetection,
        AnalysisMode::ObjectDetection,
        AnalysisMode::UnknownPersonDetection,
        AnalysisMode::Summarization,
    ];

    /// Stable slug used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::AnomalyDetection => "anomaly_detection",
            AnalysisMode::ObjectDetection => "object_detection",
            AnalysisMode::UnknownPersonDetection => "unknown_person_detection",
            AnalysisMode::Summarization => "summarization",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::AnomalyDetection => "Anomaly Detection",
            AnalysisMode::ObjectDetection => "Object Detection",
            AnalysisMode::UnknownPersonDetection => "Unknown Person Detection",
            AnalysisMode::Summarization => "Summarization",
        }
    }

    /// Only summarization takes free-text focus points.
    pub fn accepts_focus(&self) -> bool {
        matches!(self, AnalysisMode::Summarization)
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a mode name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown analysis mode: {0}")]
pub struct UnknownAnalysisMode(pub String);

impl FromStr for AnalysisMode {
    type Err = UnknownAnalysisMode;

    /// Accepts either the slug or the label, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        AnalysisMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(needle) || m.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownAnalysisMode(s.to_string()))
    }
}

/// Output of one analysis invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AnalysisResult {
    /// Generated text parsed as JSON; shape depends on the mode.
    Structured(serde_json::Value),
    /// Full response body, kept when the generated text could not be parsed.
    Raw(String),
}

impl AnalysisResult {
    pub fn is_structured(&self) -> bool {
        matches!(self, AnalysisResult::Structured(_))
    }

    /// The parsed value, if any.
    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            AnalysisResult::Structured(v) => Some(v),
            AnalysisResult::Raw(_) => None,
        }
    }
}
