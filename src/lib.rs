//! callscribe - sales-call audio to CRM pipeline
//!
//! Accepts one audio recording per request, derives structured CRM fields
//! from it via the Gemini inference backend, and appends the result as a row
//! to a Google Sheets ledger. Requests are independent tasks; the only shared
//! state is the two stateless backend clients.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::{CallPipeline, MAX_AUDIO_BYTES};

/// Slack above the audio cap so the pipeline's own size check is the one that
/// rejects oversized uploads (multipart framing adds overhead).
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Audio-to-CRM pipeline orchestrator
    pub pipeline: Arc<CallPipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Arc<CallPipeline>) -> Self {
        Self {
            pipeline,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES + BODY_LIMIT_SLACK))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser clients upload directly to this service.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
