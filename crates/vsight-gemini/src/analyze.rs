//! Video analysis via `generateContent`.

use serde::Serialize;
use tracing::{info, warn};

use vsight_models::{AnalysisMode, AnalysisResult, FileHandle};

use crate::client::{error_details, transport_message, GeminiClient};
use crate::error::{GeminiError, GeminiResult};
use crate::metrics::record_analysis;
use crate::prompt::{applied_focus, AnalysisPrompt, GenerateContentRequest};
use crate::response::{parse_generate_response, ParsedResponse};

/// Result of one analysis, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub mode: AnalysisMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    pub result: AnalysisResult,
    /// Why the result is raw, when it is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl GeminiClient {
    /// Run an analysis against an uploaded file.
    ///
    /// The file must be `ACTIVE`. A response whose text is not JSON still
    /// succeeds, carrying the raw body and the parse error.
    pub async fn analyze(
        &self,
        handle: &FileHandle,
        mime_type: &str,
        mode: AnalysisMode,
        focus: Option<&str>,
    ) -> GeminiResult<AnalysisOutcome> {
        let parsed = self.generate(handle, mime_type, mode, focus).await?;

        let parse_error = parsed.parse_error.map(|e| {
            warn!(%mode, error = %e, "Falling back to raw response");
            e.to_string()
        });
        record_analysis(
            mode.as_str(),
            if parse_error.is_some() { "raw" } else { "structured" },
        );

        Ok(AnalysisOutcome {
            mode,
            focus: applied_focus(mode, focus).map(str::to_string),
            result: parsed.result,
            parse_error,
        })
    }

    /// Send the request for `mode` and parse whatever comes back.
    pub async fn generate(
        &self,
        handle: &FileHandle,
        mime_type: &str,
        mode: AnalysisMode,
        focus: Option<&str>,
    ) -> GeminiResult<ParsedResponse> {
        if !handle.is_ready() {
            return Err(GeminiError::NotReady(handle.state.to_string()));
        }

        let prompt = AnalysisPrompt::build(mode, focus);
        let request = GenerateContentRequest::for_file(handle, mime_type, &prompt);
        let url = self.config.generate_url();

        let result = self
            .execute_request("generate_content", async {
                let response = self
                    .authorized(self.http.post(&url))
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| GeminiError::analysis_request(None, transport_message(e)))?;

                if !response.status().is_success() {
                    let (status, message) = error_details(response).await;
                    return Err(GeminiError::analysis_request(Some(status), message));
                }

                response
                    .text()
                    .await
                    .map_err(|e| GeminiError::analysis_request(None, transport_message(e)))
            })
            .await;

        let body = match result {
            Ok(body) => body,
            Err(e) => {
                record_analysis(mode.as_str(), "error");
                return Err(e);
            }
        };

        info!(%mode, model = %self.config.model, bytes = body.len(), "Analysis response received");
        Ok(parse_generate_response(&body))
    }
}
