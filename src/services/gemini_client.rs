//! Gemini inference client
//!
//! Wraps the Gemini REST API for audio analysis: uploads the staged recording
//! to the Files endpoint, issues one `generateContent` request referencing the
//! uploaded artifact, and normalizes the response text into a
//! [`CallAnalysis`]. The whole operation is bounded by a single timeout.
//!
//! The uploaded artifact is transient server-side state; it is deleted
//! best-effort once generation has completed, on every exit path including
//! cancellation, via a drop guard. Cleanup failures are logged and never
//! affect the returned result.

use std::path::Path;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::CallAnalysis;
use crate::services::pipeline::CallAnalyzer;
use crate::services::response_parser::{self, ParseError};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Timeout covering the full analysis: upload, generation, and parsing
const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(60);

const SALES_PROMPT: &str = "You are a sales assistant. Analyze this sales call recording and \
return a JSON object with exactly these fields (no markdown, no code fences, only valid JSON):\n\
- summary (string): brief summary of the conversation\n\
- action_items (array of strings): list of follow-up actions\n\
- sentiment (string): one of \"positive\", \"neutral\", \"negative\"\n\
- urgency_score (number): integer from 1 to 10\n\
- client_name (string): name of the client or contact mentioned\n\n\
Return only the JSON object, nothing else.";

/// Analysis client errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Failed to read the staged audio file
    #[error("Failed to read staged audio: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact upload to the Files endpoint failed
    #[error("Audio upload failed: {0}")]
    Upload(String),

    /// Generation request failed
    #[error("Generation failed: {0}")]
    Generate(String),

    /// Model produced no text output
    #[error("Empty response from model")]
    EmptyResponse,

    /// Model output did not normalize into an analysis record
    #[error("Analysis parse failed: {0}")]
    Parse(#[from] ParseError),

    /// Upload plus generation exceeded the analysis timeout
    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),
}

/// Client for the Gemini inference backend.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(ANALYSIS_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: GEMINI_MODEL.to_string(),
        }
    }

    /// Override the API base URL (local emulators).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Upload audio bytes to the Files endpoint and return the artifact handle.
    async fn upload_artifact(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
    ) -> Result<UploadedArtifact, AnalysisError> {
        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);
        let response = self
            .http
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(CONTENT_TYPE, mime_type)
            .body(audio)
            .send()
            .await
            .map_err(|e| AnalysisError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Upload(format!("invalid upload response: {}", e)))?;

        debug!("Uploaded audio artifact {}", upload.file.name);

        Ok(UploadedArtifact {
            http: self.http.clone(),
            delete_url: format!(
                "{}/v1beta/{}?key={}",
                self.base_url, upload.file.name, self.api_key
            ),
            name: upload.file.name,
            uri: upload.file.uri,
            mime_type: upload.file.mime_type,
        })
    }

    /// Issue one generation request bound to the uploaded artifact and return
    /// the model's primary text output.
    async fn generate(&self, artifact: &UploadedArtifact) -> Result<String, AnalysisError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": SALES_PROMPT },
                    { "fileData": { "mimeType": artifact.mime_type, "fileUri": artifact.uri } },
                ],
            }],
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Generate(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Generate(format!("HTTP {}: {}", status, body)));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Generate(format!("invalid generation response: {}", e)))?;

        Ok(generated.primary_text())
    }
}

#[async_trait::async_trait]
impl CallAnalyzer for GeminiClient {
    async fn analyze(
        &self,
        audio_path: &Path,
        mime_type: &str,
    ) -> Result<CallAnalysis, AnalysisError> {
        let analysis = tokio::time::timeout(ANALYSIS_TIMEOUT, async {
            let audio = tokio::fs::read(audio_path).await?;
            let artifact = self.upload_artifact(audio, mime_type).await?;

            // Artifact cleanup happens when `artifact` drops, whether
            // generation succeeded, failed, or the request was cancelled.
            let text = self.generate(&artifact).await?;
            if text.is_empty() {
                return Err(AnalysisError::EmptyResponse);
            }

            Ok(response_parser::parse_analysis(&text)?)
        })
        .await
        .map_err(|_| AnalysisError::Timeout(ANALYSIS_TIMEOUT))??;

        Ok(analysis)
    }
}

/// Handle for an uploaded binary artifact.
///
/// Dropping the handle schedules a best-effort DELETE of the artifact; the
/// outcome is logged and never propagated.
struct UploadedArtifact {
    http: Client,
    delete_url: String,
    name: String,
    uri: String,
    mime_type: String,
}

impl Drop for UploadedArtifact {
    fn drop(&mut self) {
        let http = self.http.clone();
        let url = std::mem::take(&mut self.delete_url);
        let name = std::mem::take(&mut self.name);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                match http.delete(&url).send().await {
                    Ok(response) if response.status().is_success() => {
                        debug!("Deleted audio artifact {}", name);
                    }
                    Ok(response) => {
                        warn!(
                            "Artifact cleanup failed for {}: HTTP {}",
                            name,
                            response.status()
                        );
                    }
                    Err(e) => warn!("Artifact cleanup failed for {}: {}", name, e),
                }
            });
        }
    }
}

/// Files endpoint upload response
#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    /// Resource name, e.g. "files/abc-123"
    name: String,
    /// Download URI referenced by generation requests
    uri: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

/// generateContent response, reduced to the parts this client consumes
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn primary_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default()
    }
}
