//! Session handlers.
//!
//! Contains:
//! - Session lifecycle (create / status / delete)
//! - Video upload, which runs upload and processing in the background
//! - Cancellation of in-flight uploads
//! - Synchronous analysis of the processed video

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};

use vsight_gemini::{AnalysisOutcome, VideoUpload, WorkflowStatus};
use vsight_models::{AnalysisMode, SessionId};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::sessions::SessionEntry;
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub status: WorkflowStatus,
}

impl SessionResponse {
    fn from_entry(entry: &SessionEntry) -> Self {
        Self {
            session_id: entry.id.clone(),
            created_at: entry.created_at,
            status: entry.status(),
        }
    }
}

#[derive(Deserialize)]
pub struct UploadQuery {
    /// Original file name; its extension selects the format
    pub filename: Option<String>,
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    /// Mode slug or label
    pub mode: String,
    #[serde(default)]
    pub focus: Option<String>,
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a session with an idle workflow.
pub async fn create_session(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let entry = state.sessions.create().await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from_entry(&entry))))
}

/// Current status snapshot. Does not wait for in-flight work.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let entry = state.sessions.get(&session_id).await?;
    Ok(Json(SessionResponse::from_entry(&entry)))
}

/// Cancel in-flight work and discard the session.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.sessions.remove(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Upload
// ============================================================================

/// Accept a raw video body and start uploading it in the background.
///
/// Any upload already running for the session is cancelled first. The
/// response reflects the `file_selected` phase; progress is read through
/// `GET /api/sessions/:id`.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let entry = state.sessions.get(&session_id).await?;

    let filename = query
        .filename
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("filename query parameter is required"))?;

    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::bad_request(rejection.body_text())
        }
    })?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    let video = VideoUpload::new(filename, bytes.to_vec())?;

    let cancel = entry.restart_cancellation().await;
    let mut workflow = entry.lock_workflow().await;
    workflow.select_file(video.display_name.clone(), video.format)?;

    info!(
        session_id = %entry.id,
        display_name = %video.display_name,
        bytes = video.len(),
        "Accepted video upload"
    );
    metrics::record_upload_started(video.format.extension());

    let span = info_span!("upload_task", session_id = %entry.id);
    tokio::spawn(
        async move {
            match workflow.upload_and_process(video, &cancel).await {
                Ok(handle) => info!(resource_name = %handle.resource_name, "Video ready for analysis"),
                Err(e) => warn!(code = e.code(), "Upload did not complete: {}", e),
            }
        }
        .instrument(span),
    );

    Ok((StatusCode::ACCEPTED, Json(SessionResponse::from_entry(&entry))))
}

/// Cancel the in-flight upload or processing wait.
pub async fn cancel_upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let entry = state.sessions.get(&session_id).await?;
    entry.cancel().await;
    info!(session_id = %entry.id, "Cancellation requested");
    Ok((StatusCode::ACCEPTED, Json(SessionResponse::from_entry(&entry))))
}

// ============================================================================
// Analysis
// ============================================================================

/// Run one analysis against the session's processed video.
///
/// Fails with 409 while an upload or another analysis is running, or when
/// no processed video is available.
pub async fn analyze_video(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalysisOutcome>> {
    let entry = state.sessions.get(&session_id).await?;
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let mode: AnalysisMode = request
        .mode
        .parse()
        .map_err(|e: vsight_models::UnknownAnalysisMode| ApiError::bad_request(e.to_string()))?;

    let mut workflow = entry.try_lock_workflow()?;
    let outcome = workflow
        .analyze(mode, request.focus.as_deref())
        .instrument(info_span!("analysis", session_id = %entry.id, %mode))
        .await?;

    Ok(Json(outcome))
}
