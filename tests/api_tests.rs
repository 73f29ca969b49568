//! HTTP API integration tests
//!
//! Drives the full router through tower's `oneshot` with stubbed backend
//! clients, so every pipeline outcome can be exercised without network access.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use callscribe::models::CallAnalysis;
use callscribe::services::{
    AnalysisError, AnalysisLedger, CallAnalyzer, CallPipeline, LedgerError,
};
use callscribe::{build_router, AppState};

const BOUNDARY: &str = "callscribe-test-boundary";

/// Analyzer stub returning a fixed record (or a fixed failure).
struct StubAnalyzer {
    fail: bool,
}

#[async_trait::async_trait]
impl CallAnalyzer for StubAnalyzer {
    async fn analyze(
        &self,
        _audio_path: &Path,
        _mime_type: &str,
    ) -> Result<CallAnalysis, AnalysisError> {
        if self.fail {
            Err(AnalysisError::EmptyResponse)
        } else {
            Ok(sample_analysis())
        }
    }
}

/// Ledger stub with a configurable failure.
struct StubLedger {
    fail: bool,
}

#[async_trait::async_trait]
impl AnalysisLedger for StubLedger {
    async fn append(&self, _analysis: &CallAnalysis) -> Result<(), LedgerError> {
        if self.fail {
            Err(LedgerError::Api(429, "quota exceeded".to_string()))
        } else {
            Ok(())
        }
    }
}

fn sample_analysis() -> CallAnalysis {
    CallAnalysis {
        summary: "Renewal discussion with decision maker".to_string(),
        action_items: vec!["Send updated quote".to_string()],
        sentiment: "positive".to_string(),
        urgency_score: 8,
        client_name: "Acme".to_string(),
    }
}

fn test_app(analyzer_fails: bool, ledger_fails: bool) -> axum::Router {
    let pipeline = CallPipeline::new(
        Arc::new(StubAnalyzer {
            fail: analyzer_fails,
        }),
        Arc::new(StubLedger { fail: ledger_fails }),
    );
    build_router(AppState::new(Arc::new(pipeline)))
}

/// Build a multipart/form-data body with one `file` part.
fn multipart_body(file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn analyze_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(file_name, bytes)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_route_reports_ok() {
    let app = test_app(false, false);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "callscribe");
}

#[tokio::test]
async fn successful_analysis_returns_record_fields() {
    let app = test_app(false, false);

    let response = app
        .oneshot(analyze_request("call.wav", b"RIFF fake audio"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["summary"], "Renewal discussion with decision maker");
    assert_eq!(body["action_items"], serde_json::json!(["Send updated quote"]));
    assert_eq!(body["sentiment"], "positive");
    assert_eq!(body["urgency_score"], 8);
    assert_eq!(body["client_name"], "Acme");
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let app = test_app(false, false);

    let response = app
        .oneshot(analyze_request("call.ogg", b"OggS fake audio"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let app = test_app(false, false);

    // A multipart body whose only part is named "attachment"
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"attachment\"; filename=\"call.wav\"\r\n\r\n",
    );
    body.extend_from_slice(b"bytes");
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analysis_failure_returns_internal_error() {
    let app = test_app(true, false);

    let response = app
        .oneshot(analyze_request("call.mp3", b"ID3 fake audio"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert!(body.get("analysis").is_none(), "no partial record on analysis failure");
}

#[tokio::test]
async fn persistence_failure_still_returns_the_record() {
    let app = test_app(false, true);

    let response = app
        .oneshot(analyze_request("call.webm", b"webm fake audio"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "PERSISTENCE_FAILED");
    // The completed analysis is disclosed alongside the error
    assert_eq!(body["analysis"]["client_name"], "Acme");
    assert_eq!(body["analysis"]["urgency_score"], 8);
}
