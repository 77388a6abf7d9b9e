//! Per-mode report schemas.
//!
//! These describe the JSON the model is asked to produce for each
//! [`AnalysisMode`]. The service does not enforce them, so they are an
//! optional typed view over a structured result, never a parsing requirement.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::AnalysisMode;

/// Severity / suspicion level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

/// One anomaly found in the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnomalyEvent {
    /// Position in the video (MM:SS)
    pub timestamp: String,
    pub description: String,
    pub severity: Level,
}

/// One object class with its occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DetectedObject {
    pub object_name: String,
    pub count: u32,
    #[serde(default)]
    pub timestamps: Vec<String>,
}

/// One individual flagged by unknown-person detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PersonSighting {
    pub timestamp: String,
    pub description: String,
    pub suspicion_level: Level,
}

/// A notable moment inside a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KeyEvent {
    pub timestamp: String,
    pub event: String,
}

/// Summarization output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoSummary {
    pub summary: String,
    #[serde(default)]
    pub key_events: Vec<KeyEvent>,
}

/// A structured result interpreted according to its mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", content = "report", rename_all = "snake_case")]
pub enum ModeReport {
    AnomalyDetection(Vec<AnomalyEvent>),
    ObjectDetection(Vec<DetectedObject>),
    UnknownPersonDetection(Vec<PersonSighting>),
    Summarization(VideoSummary),
}

impl ModeReport {
    /// Decode a structured result using the schema of `mode`.
    pub fn from_value(mode: AnalysisMode, value: &Value) -> Result<Self, serde_json::Error> {
        let value = value.clone();
        Ok(match mode {
            AnalysisMode::AnomalyDetection => ModeReport::AnomalyDetection(serde_json::from_value(value)?),
            AnalysisMode::ObjectDetection => ModeReport::ObjectDetection(serde_json::from_value(value)?),
            AnalysisMode::UnknownPersonDetection => {
                ModeReport::UnknownPersonDetection(serde_json::from_value(value)?)
            }
            AnalysisMode::Summarization => ModeReport::Summarization(serde_json::from_value(value)?),
        })
    }

    pub fn mode(&self) -> AnalysisMode {
        match self {
            ModeReport::AnomalyDetection(_) => AnalysisMode::AnomalyDetection,
            ModeReport::ObjectDetection(_) => AnalysisMode::ObjectDetection,
            ModeReport::UnknownPersonDetection(_) => AnalysisMode::UnknownPersonDetection,
            ModeReport::Summarization(_) => AnalysisMode::Summarization,
        }
    }
}
