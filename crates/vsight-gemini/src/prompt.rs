//! Analysis request building.
//!
//! Each [`AnalysisMode`] has a fixed instruction that spells out the JSON
//! shape expected back. Summarization may add a focus sentence; focus text is
//! passed through verbatim.

use serde::Serialize;

use vsight_models::{AnalysisMode, FileHandle};

const ANOMALY_PROMPT: &str = "Analyze the video for any anomalies, unusual events, or safety hazards. \
Return a JSON list of events with the following schema: \
[{'timestamp': 'MM:SS', 'description': 'string', 'severity': 'low/medium/high'}]";

const OBJECT_PROMPT: &str = "Detect the main objects (cars, people, bags, etc.) in the video. \
Return a JSON list with the following schema: \
[{'object_name': 'string', 'count': int, 'timestamps': ['MM:SS', ...]}]";

const UNKNOWN_PERSON_PROMPT: &str = "Identify individuals in the video. Flag any that appear to be unauthorized, suspicious, or unknown \
(based on general context, e.g., loitering, hiding face). \
Return a JSON list with: \
[{'timestamp': 'MM:SS', 'description': 'string', 'suspicion_level': 'low/medium/high'}]";

const SUMMARY_PROMPT: &str = "Summarize this video. Return a JSON object with: \
{'summary': 'string', 'key_events': [{'timestamp': 'MM:SS', 'event': 'string'}]}";

const JSON_MIME_TYPE: &str = "application/json";

/// Prompt text for one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt {
    pub mode: AnalysisMode,
    pub text: String,
}

impl AnalysisPrompt {
    /// Build the prompt for `mode`.
    ///
    /// `focus` only applies to summarization and is ignored when empty.
    pub fn build(mode: AnalysisMode, focus: Option<&str>) -> Self {
        let mut text = base_instruction(mode).to_string();

        if let Some(focus) = applied_focus(mode, focus) {
            text.push_str(" Focus the summary only on: ");
            text.push_str(focus);
        }

        Self { mode, text }
    }
}

/// The focus text that [`AnalysisPrompt::build`] will append, if any.
pub fn applied_focus(mode: AnalysisMode, focus: Option<&str>) -> Option<&str> {
    focus.filter(|f| mode.accepts_focus() && !f.is_empty())
}

/// Fixed instruction for a mode.
pub fn base_instruction(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::AnomalyDetection => ANOMALY_PROMPT,
        AnalysisMode::ObjectDetection => OBJECT_PROMPT,
        AnalysisMode::UnknownPersonDetection => UNKNOWN_PERSON_PROMPT,
        AnalysisMode::Summarization => SUMMARY_PROMPT,
    }
}

/// `generateContent` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    File { file_data: FileData },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    pub response_mime_type: String,
}

impl GenerateContentRequest {
    /// Reference the uploaded file, then the prompt, and ask for JSON output.
    pub fn for_file(handle: &FileHandle, mime_type: &str, prompt: &AnalysisPrompt) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::File {
                        file_data: FileData {
                            mime_type: mime_type.to_string(),
                            file_uri: handle.uri.clone(),
                        },
                    },
                    Part::Text {
                        text: prompt.text.clone(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE.to_string(),
            },
        }
    }
}
