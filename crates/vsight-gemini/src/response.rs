//! Analysis response parsing.
//!
//! The model is asked for JSON but nothing guarantees it, so parsing degrades
//! to the raw response body instead of failing the analysis.

use serde::Deserialize;
use serde_json::Value;

use vsight_models::AnalysisResult;

use crate::error::GeminiError;

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Parser output: always a displayable result, plus the parse failure if the
/// result had to fall back to raw text.
#[derive(Debug)]
pub struct ParsedResponse {
    pub result: AnalysisResult,
    /// Always [`GeminiError::ResponseParse`] when set
    pub parse_error: Option<GeminiError>,
}

/// Parse a `generateContent` response body.
pub fn parse_generate_response(body: &str) -> ParsedResponse {
    match extract_structured(body) {
        Ok(value) => ParsedResponse {
            result: AnalysisResult::Structured(value),
            parse_error: None,
        },
        Err(reason) => ParsedResponse {
            result: AnalysisResult::Raw(body.to_string()),
            parse_error: Some(GeminiError::ResponseParse(reason)),
        },
    }
}

fn extract_structured(body: &str) -> Result<Value, String> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| format!("response body is not valid JSON: {}", e))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| "no text in candidates[0].content.parts[0]".to_string())?;

    serde_json::from_str(strip_code_fence(&text)).map_err(|e| format!("generated text is not valid JSON: {}", e))
}

/// Remove a surrounding Markdown code fence, e.g. "```json ... ```".
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
