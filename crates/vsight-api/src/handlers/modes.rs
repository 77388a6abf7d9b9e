//! Analysis mode listing.

use axum::Json;
use serde::Serialize;

use vsight_models::{AnalysisMode, VideoFormat};

#[derive(Serialize)]
pub struct ModeInfo {
    pub mode: AnalysisMode,
    pub label: &'static str,
    pub accepts_focus: bool,
}

#[derive(Serialize)]
pub struct ModesResponse {
    pub modes: Vec<ModeInfo>,
    /// Accepted upload extensions
    pub formats: Vec<&'static str>,
}

/// List the analysis modes and accepted formats.
pub async fn list_modes() -> Json<ModesResponse> {
    Json(ModesResponse {
        modes: AnalysisMode::ALL
            .into_iter()
            .map(|mode| ModeInfo {
                mode,
                label: mode.label(),
                accepts_focus: mode.accepts_focus(),
            })
            .collect(),
        formats: VideoFormat::ALL.iter().map(|f| f.extension()).collect(),
    })
}
