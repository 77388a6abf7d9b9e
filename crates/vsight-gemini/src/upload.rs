//! Resumable upload to the Gemini Files API.
//!
//! Protocol:
//! 1. `POST /upload/<ver>/files` with `X-Goog-Upload-Command: start` opens a
//!    session; the session URL comes back in `X-Goog-Upload-URL`.
//! 2. `POST <session url>` with `upload, finalize` at offset 0 sends every
//!    byte in one request and returns the file handle.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use vsight_models::{FileHandle, FileState, UploadSession, VideoFormat};

use crate::client::{error_details, transport_message, GeminiClient};
use crate::error::{GeminiError, GeminiResult};

const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// A video ready to be sent.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    /// Name shown in the remote file listing
    pub display_name: String,
    pub format: VideoFormat,
    pub bytes: Vec<u8>,
}

impl VideoUpload {
    /// Build an upload, resolving the format from the display name.
    pub fn new(display_name: impl Into<String>, bytes: Vec<u8>) -> GeminiResult<Self> {
        let display_name = display_name.into();
        let format = VideoFormat::from_filename(&display_name)?;
        Ok(Self {
            display_name,
            format,
            bytes,
        })
    }

    /// Read a video from disk. The file name becomes the display name.
    pub async fn from_path(path: impl AsRef<Path>) -> GeminiResult<Self> {
        let path = path.as_ref();
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let format = VideoFormat::from_filename(&display_name)?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            display_name,
            format,
            bytes,
        })
    }

    /// Exact byte length declared to the service.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct StartUploadRequest<'a> {
    file: StartUploadFile<'a>,
}

#[derive(Debug, Serialize)]
struct StartUploadFile<'a> {
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: Option<UploadedFile>,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    uri: Option<String>,
    name: Option<String>,
    state: Option<FileState>,
}

impl GeminiClient {
    /// Open a resumable upload session.
    ///
    /// `declared_len` must be the exact byte length that will be transmitted.
    pub async fn start_upload(
        &self,
        display_name: &str,
        declared_len: u64,
        format: VideoFormat,
    ) -> GeminiResult<UploadSession> {
        let url = self.config.upload_start_url();
        let mime_type = format.mime_type();

        self.execute_request("upload_start", async {
            let request = self
                .authorized(self.http.post(&url))
                .header("X-Goog-Upload-Protocol", "resumable")
                .header("X-Goog-Upload-Command", "start")
                .header("X-Goog-Upload-Header-Content-Length", declared_len.to_string())
                .header("X-Goog-Upload-Header-Content-Type", mime_type)
                .json(&StartUploadRequest {
                    file: StartUploadFile { display_name },
                });

            let response = request
                .send()
                .await
                .map_err(|e| GeminiError::upload_init(None, transport_message(e)))?;

            if !response.status().is_success() {
                let (status, message) = error_details(response).await;
                return Err(GeminiError::upload_init(Some(status), message));
            }

            let session_url = response
                .headers()
                .get(UPLOAD_URL_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| GeminiError::upload_init(None, "response is missing the X-Goog-Upload-URL header"))?
                .to_string();

            debug!(declared_len, mime_type, "Opened resumable upload session");

            Ok(UploadSession {
                session_url,
                declared_len,
                mime_type: mime_type.to_string(),
            })
        })
        .await
    }

    /// Send the whole file to a session and finalize it.
    ///
    /// The byte count is checked against the declared length before anything
    /// is sent; a mismatch is rejected locally.
    pub async fn transmit(&self, session: UploadSession, bytes: Vec<u8>) -> GeminiResult<FileHandle> {
        let actual_len = bytes.len() as u64;
        if actual_len != session.declared_len {
            return Err(GeminiError::upload_transmit(
                None,
                format!(
                    "declared length {} does not match {} bytes to send",
                    session.declared_len, actual_len
                ),
            ));
        }

        self.execute_request("upload_finalize", async {
            let response = self
                .http
                .post(&session.session_url)
                .header(reqwest::header::CONTENT_LENGTH, actual_len.to_string())
                .header("X-Goog-Upload-Offset", "0")
                .header("X-Goog-Upload-Command", "upload, finalize")
                .body(bytes)
                .send()
                .await
                .map_err(|e| GeminiError::upload_transmit(None, transport_message(e)))?;

            if !response.status().is_success() {
                let (status, message) = error_details(response).await;
                return Err(GeminiError::upload_transmit(Some(status), message));
            }

            let body = response
                .text()
                .await
                .map_err(|e| GeminiError::upload_transmit(None, transport_message(e)))?;

            parse_upload_response(&body)
        })
        .await
    }

    /// Open a session and transmit `video`, observing `cancel` at both steps.
    pub async fn upload(&self, video: VideoUpload, cancel: &CancellationToken) -> GeminiResult<FileHandle> {
        if cancel.is_cancelled() {
            return Err(GeminiError::Cancelled);
        }

        let session = tokio::select! {
            _ = cancel.cancelled() => return Err(GeminiError::Cancelled),
            session = self.start_upload(&video.display_name, video.len(), video.format) => session?,
        };

        if cancel.is_cancelled() {
            return Err(GeminiError::Cancelled);
        }

        let handle = tokio::select! {
            _ = cancel.cancelled() => return Err(GeminiError::Cancelled),
            handle = self.transmit(session, video.bytes) => handle?,
        };

        info!(
            resource_name = %handle.resource_name,
            state = %handle.state,
            "Upload complete"
        );
        Ok(handle)
    }
}

/// Decode the finalize response into a fully populated handle.
fn parse_upload_response(body: &str) -> GeminiResult<FileHandle> {
    let parsed: UploadResponse = serde_json::from_str(body)
        .map_err(|e| GeminiError::UploadResponseFormat(format!("invalid JSON: {}", e)))?;

    let file = parsed
        .file
        .ok_or_else(|| GeminiError::UploadResponseFormat("missing \"file\" object".into()))?;

    let uri = file
        .uri
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| GeminiError::UploadResponseFormat("missing file.uri".into()))?;
    let name = file
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| GeminiError::UploadResponseFormat("missing file.name".into()))?;

    // Freshly finalized files are polled regardless of the reported state
    Ok(FileHandle::new(uri, name, file.state.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload_response() {
        let handle = parse_upload_response(
            r#"{"file":{"uri":"https://files/abc","name":"files/abc","state":"PROCESSING","mimeType":"video/mp4"}}"#,
        )
        .unwrap();

        assert_eq!(handle.uri, "https://files/abc");
        assert_eq!(handle.resource_name, "files/abc");
        assert_eq!(handle.state, FileState::Processing);
    }

    #[test]
    fn test_parse_upload_response_defaults_state() {
        let handle = parse_upload_response(r#"{"file":{"uri":"u","name":"files/x"}}"#).unwrap();
        assert_eq!(handle.state, FileState::Processing);
    }

    #[test]
    fn test_parse_upload_response_rejects_partial_handles() {
        for body in [
            r#"{}"#,
            r#"{"file":{"name":"files/x"}}"#,
            r#"{"file":{"uri":"u"}}"#,
            r#"{"file":{"uri":"","name":"files/x"}}"#,
            r#"not json"#,
        ] {
            let err = parse_upload_response(body).unwrap_err();
            assert!(
                matches!(err, GeminiError::UploadResponseFormat(_)),
                "unexpected error for {}: {:?}",
                body,
                err
            );
        }
    }

    #[test]
    fn test_from_path_missing_file_is_io_error() {
        let err = tokio_test::block_on(VideoUpload::from_path("/nonexistent/vsight/clip.mp4")).unwrap_err();
        assert!(matches!(err, GeminiError::Io(_)));
    }

    #[test]
    fn test_from_path_checks_extension_first() {
        let err = tokio_test::block_on(VideoUpload::from_path("/nonexistent/vsight/notes.txt")).unwrap_err();
        assert!(matches!(err, GeminiError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_video_upload_rejects_unsupported_names() {
        assert!(VideoUpload::new("clip.mkv", vec![1, 2, 3]).is_err());
        let upload = VideoUpload::new("gate.webm", vec![0; 16]).unwrap();
        assert_eq!(upload.format, VideoFormat::Webm);
        assert_eq!(upload.len(), 16);
    }
}
