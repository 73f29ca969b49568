//! Audio analysis API handler
//!
//! POST /analyze: accept one multipart audio upload, run the pipeline, and
//! map the outcome to a caller-facing response. A persistence failure after a
//! completed analysis returns 500 with the record included alongside the
//! error, so the caller does not lose completed work.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::services::{AudioSubmission, PipelineOutcome};
use crate::AppState;

/// Multipart field carrying the audio upload
const FILE_FIELD: &str = "file";

/// POST /analyze
pub async fn analyze_call(State(state): State<AppState>, multipart: Multipart) -> Response {
    let submission = match extract_submission(multipart).await {
        Ok(submission) => submission,
        Err(err) => return err.into_response(),
    };

    match state.pipeline.run(submission).await {
        Ok(PipelineOutcome::Complete(analysis)) => {
            (StatusCode::OK, Json(analysis)).into_response()
        }
        Ok(PipelineOutcome::RecordedNotPersisted { analysis, error }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": {
                    "code": "PERSISTENCE_FAILED",
                    "message": error.to_string(),
                },
                "analysis": analysis,
            })),
        )
            .into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// Pull the `file` field out of the multipart body.
async fn extract_submission(mut multipart: Multipart) -> ApiResult<AudioSubmission> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        return Ok(AudioSubmission {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest(
        "Missing 'file' field; upload a .wav, .mp3, or .webm recording".to_string(),
    ))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze_call))
}
