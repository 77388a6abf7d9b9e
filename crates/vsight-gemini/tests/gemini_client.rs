//! Protocol tests for the Gemini client against a mock server.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vsight_gemini::{
    CancellationToken, GeminiClient, GeminiConfig, GeminiError, PollPolicy, VideoUpload,
};
use vsight_models::{AnalysisMode, AnalysisResult, FileHandle, FileState, UploadSession, VideoFormat};

// =============================================================================
// Test Helpers
// =============================================================================

const API_KEY: &str = "test-key";

fn client_for(server: &MockServer) -> GeminiClient {
    let config = GeminiConfig::new(API_KEY)
        .with_base_url(server.uri())
        .with_poll_policy(PollPolicy::every(Duration::from_millis(10)));
    GeminiClient::new(config).unwrap()
}

fn session_for(server: &MockServer, declared_len: u64) -> UploadSession {
    UploadSession {
        session_url: format!("{}/resumable/session-1", server.uri()),
        declared_len,
        mime_type: "video/mp4".to_string(),
    }
}

fn processing_handle() -> FileHandle {
    FileHandle::new("https://files.example/abc", "files/abc", FileState::Processing)
}

fn active_handle() -> FileHandle {
    FileHandle::new("https://files.example/abc", "files/abc", FileState::Active)
}

fn generated(text: &str) -> Value {
    json!({"candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]})
}

async fn mount_state(server: &MockServer, state: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/v1beta/files/abc"))
        .and(query_param("key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": {"name": "files/abc", "state": state}})))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

fn header_value(request: &wiremock::Request, name: &str) -> String {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Upload Initiator
// =============================================================================

#[tokio::test]
async fn test_start_upload_returns_session_url() {
    let server = MockServer::start().await;
    let session_url = format!("{}/resumable/session-1", server.uri());

    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .and(query_param("key", API_KEY))
        .and(header("X-Goog-Upload-Protocol", "resumable"))
        .and(header("X-Goog-Upload-Command", "start"))
        .and(header("X-Goog-Upload-Header-Content-Length", "2048"))
        .and(header("X-Goog-Upload-Header-Content-Type", "video/quicktime"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Goog-Upload-URL", session_url.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    let session = client_for(&server)
        .start_upload("lobby.mov", 2048, VideoFormat::Mov)
        .await
        .unwrap();

    assert_eq!(session.session_url, session_url);
    assert_eq!(session.declared_len, 2048);
    assert_eq!(session.mime_type, "video/quicktime");

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body, json!({"file": {"display_name": "lobby.mov"}}));
    assert_eq!(header_value(&requests[0], "content-type"), "application/json");
}

#[tokio::test]
async fn test_start_upload_without_session_header_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .start_upload("gate.mp4", 10, VideoFormat::Mp4)
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::UploadInit { status: None, .. }));
}

#[tokio::test]
async fn test_start_upload_http_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .start_upload("gate.mp4", 10, VideoFormat::Mp4)
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), Some(403));
    assert!(matches!(err, GeminiError::UploadInit { .. }));
    assert!(err.to_string().contains("API key not valid"));
    assert!(!err.to_string().contains(API_KEY));
}

// =============================================================================
// Transmitter
// =============================================================================

#[tokio::test]
async fn test_transmit_sends_bytes_and_finalizes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resumable/session-1"))
        .and(header("X-Goog-Upload-Offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {"uri": "https://files.example/abc", "name": "files/abc", "state": "PROCESSING"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let bytes = vec![7u8; 4096];
    let handle = client_for(&server)
        .transmit(session_for(&server, 4096), bytes.clone())
        .await
        .unwrap();

    assert_eq!(handle, processing_handle());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, bytes);
    assert_eq!(header_value(&requests[0], "x-goog-upload-command"), "upload, finalize");
    assert_eq!(header_value(&requests[0], "content-length"), "4096");
}

#[tokio::test]
async fn test_transmit_rejects_length_mismatch_without_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .transmit(session_for(&server, 100), vec![0u8; 99])
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::UploadTransmit { status: None, .. }));
}

#[tokio::test]
async fn test_transmit_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resumable/session-1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .transmit(session_for(&server, 3), vec![1, 2, 3])
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::UploadTransmit { status: Some(503), .. }));
}

#[tokio::test]
async fn test_transmit_without_handle_fields_is_format_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resumable/session-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": {"name": "files/abc"}})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .transmit(session_for(&server, 3), vec![1, 2, 3])
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::UploadResponseFormat(_)));
}

#[tokio::test]
async fn test_upload_runs_both_steps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-goog-upload-url", format!("{}/resumable/session-1", server.uri()).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resumable/session-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {"uri": "https://files.example/abc", "name": "files/abc", "state": "PROCESSING"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let video = VideoUpload::new("yard.webm", vec![9u8; 512]).unwrap();
    let handle = client_for(&server)
        .upload(video, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(handle.resource_name, "files/abc");
    assert!(!handle.uri.is_empty());
}

// =============================================================================
// Processing State Poller
// =============================================================================

#[tokio::test]
async fn test_fetch_state_accepts_both_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/files/wrapped"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": {"state": "ACTIVE"}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/files/bare"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "files/bare", "state": "FAILED"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.fetch_file_state("files/wrapped").await.unwrap(), FileState::Active);
    assert_eq!(client.fetch_file_state("files/bare").await.unwrap(), FileState::Failed);
}

#[tokio::test]
async fn test_poll_until_active() {
    let server = MockServer::start().await;
    mount_state(&server, "PROCESSING", 2).await;
    mount_state(&server, "ACTIVE", 1).await;

    let client = client_for(&server);
    let mut observed = Vec::new();
    let handle = client
        .wait_until_active_with(
            processing_handle(),
            &client.config().poll,
            &CancellationToken::new(),
            |attempt, state| observed.push((attempt, state)),
        )
        .await
        .unwrap();

    assert!(handle.is_ready());
    assert_eq!(
        observed,
        vec![(1, FileState::Processing), (2, FileState::Processing), (3, FileState::Active)]
    );
}

#[tokio::test]
async fn test_poll_failed_state_is_terminal() {
    let server = MockServer::start().await;
    mount_state(&server, "PROCESSING", 1).await;
    mount_state(&server, "FAILED", 1).await;
    // Must not be reached
    mount_state(&server, "ACTIVE", 10).await;

    let client = client_for(&server);
    let err = client
        .wait_until_active(processing_handle(), &client.config().poll, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::ProcessingFailed(ref name) if name == "files/abc"));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_poll_http_error_aborts_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/files/abc"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .wait_until_active(processing_handle(), &client.config().poll, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::Poll { status: Some(500), .. }));
}

#[tokio::test]
async fn test_poll_attempt_limit() {
    let server = MockServer::start().await;
    mount_state(&server, "PROCESSING", 100).await;

    let client = client_for(&server);
    let policy = PollPolicy::every(Duration::from_millis(5)).with_max_attempts(3);
    let err = client
        .wait_until_active(processing_handle(), &policy, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::PollTimeout { attempts: 3 }));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_poll_deadline() {
    let server = MockServer::start().await;
    mount_state(&server, "PROCESSING", 1000).await;

    let client = client_for(&server);
    let policy = PollPolicy::every(Duration::from_millis(20)).with_timeout(Duration::from_millis(100));
    let err = client
        .wait_until_active(processing_handle(), &policy, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::PollTimeout { .. }));
}

#[tokio::test]
async fn test_poll_observes_cancellation() {
    let server = MockServer::start().await;
    mount_state(&server, "PROCESSING", 1000).await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let policy = PollPolicy::every(Duration::from_millis(10));
    let err = client
        .wait_until_active(processing_handle(), &policy, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::Cancelled));
}

// =============================================================================
// Analysis
// =============================================================================

#[tokio::test]
async fn test_object_detection_structured_result() {
    let server = MockServer::start().await;
    let text = r#"[{"object_name":"car","count":2,"timestamps":["00:05","00:12"]}]"#;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(query_param("key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(generated(text)))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .analyze(&active_handle(), "video/mp4", AnalysisMode::ObjectDetection, None)
        .await
        .unwrap();

    assert_eq!(
        outcome.result,
        AnalysisResult::Structured(json!([{"object_name": "car", "count": 2, "timestamps": ["00:05", "00:12"]}]))
    );
    assert!(outcome.parse_error.is_none());

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(
        body["contents"][0]["parts"][0],
        json!({"file_data": {"mime_type": "video/mp4", "file_uri": "https://files.example/abc"}})
    );
    assert!(body["contents"][0]["parts"][1]["text"].as_str().unwrap().starts_with("Detect the main objects"));
    assert_eq!(body["generationConfig"], json!({"responseMimeType": "application/json"}));
}

#[tokio::test]
async fn test_outcome_echoes_only_applied_focus() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generated(r#"{"summary":"quiet","key_events":[]}"#)))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let empty = client
        .analyze(&active_handle(), "video/mp4", AnalysisMode::Summarization, Some(""))
        .await
        .unwrap();
    assert_eq!(empty.focus, None);

    let spaces = client
        .analyze(&active_handle(), "video/mp4", AnalysisMode::Summarization, Some(" "))
        .await
        .unwrap();
    assert_eq!(spaces.focus.as_deref(), Some(" "));

    let requests = server.received_requests().await.unwrap();
    let first: Value = requests[0].body_json().unwrap();
    let second: Value = requests[1].body_json().unwrap();
    assert!(!first["contents"][0]["parts"][1]["text"].as_str().unwrap().contains("Focus the summary"));
    assert!(second["contents"][0]["parts"][1]["text"]
        .as_str()
        .unwrap()
        .ends_with("Focus the summary only on:  "));
}

#[tokio::test]
async fn test_unparseable_generation_returns_raw_body() {
    let server = MockServer::start().await;
    let body = generated("not json");
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .analyze(&active_handle(), "video/mp4", AnalysisMode::Summarization, Some("front gate"))
        .await
        .unwrap();

    match &outcome.result {
        AnalysisResult::Raw(raw) => {
            let raw: Value = serde_json::from_str(raw).unwrap();
            assert_eq!(raw, body);
        }
        other => panic!("expected raw result, got {:?}", other),
    }
    assert!(outcome.parse_error.unwrap().starts_with("Failed to parse response"));
    assert_eq!(outcome.focus.as_deref(), Some("front gate"));
}

#[tokio::test]
async fn test_analysis_http_error_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_string("File not in ACTIVE state"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .analyze(&active_handle(), "video/mp4", AnalysisMode::AnomalyDetection, None)
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::AnalysisRequest { status: Some(400), .. }));
    assert!(err.to_string().contains("File not in ACTIVE state"));
}

#[tokio::test]
async fn test_configured_model_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generated("[]")))
        .expect(1)
        .mount(&server)
        .await;

    let config = GeminiConfig::new(API_KEY)
        .with_base_url(server.uri())
        .with_model("gemini-2.5-pro");
    let outcome = GeminiClient::new(config)
        .unwrap()
        .analyze(&active_handle(), "video/webm", AnalysisMode::UnknownPersonDetection, None)
        .await
        .unwrap();

    assert_eq!(outcome.result, AnalysisResult::Structured(json!([])));
}
