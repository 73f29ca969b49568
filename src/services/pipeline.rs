//! Audio-to-CRM pipeline orchestration
//!
//! Drives one submission through validate → stage → analyze → persist and maps
//! the outcome for the API layer. The two external backends sit behind the
//! [`CallAnalyzer`] and [`AnalysisLedger`] traits so the orchestration is
//! testable without network access.
//!
//! The staged audio lives in a uniquely named transient file that is removed
//! when the handle drops, on every exit path including cancellation.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::CallAnalysis;
use crate::services::gemini_client::AnalysisError;
use crate::services::sheets_client::LedgerError;

/// Maximum accepted audio size (25 MiB)
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// One inbound audio submission: declared filename plus raw bytes.
#[derive(Debug)]
pub struct AudioSubmission {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Accepted audio containers, keyed by filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Webm,
}

impl AudioFormat {
    /// Resolve the format from a declared filename, case-insensitive.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }

    /// Content-type label sent to the inference backend.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Webm => "audio/webm",
        }
    }

    /// Filename suffix for the staged transient file.
    fn extension(self) -> &'static str {
        match self {
            Self::Wav => ".wav",
            Self::Mp3 => ".mp3",
            Self::Webm => ".webm",
        }
    }
}

/// Pipeline failures that carry no analysis record
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad input shape, size, or type; rejected before any external call
    #[error("Invalid submission: {0}")]
    Validation(String),

    /// Staging the upload to transient storage failed
    #[error("Failed to stage audio: {0}")]
    Staging(#[source] std::io::Error),

    /// Analysis failed; no ledger write was attempted
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Terminal pipeline results that produced an analysis record.
///
/// `RecordedNotPersisted` is a deliberate partial-success contract: the ledger
/// append failed but the completed analysis is still disclosed to the caller
/// rather than discarded.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Analysis produced and persisted
    Complete(CallAnalysis),
    /// Analysis produced but the ledger append failed
    RecordedNotPersisted {
        analysis: CallAnalysis,
        error: LedgerError,
    },
}

/// Inference backend seam.
#[async_trait::async_trait]
pub trait CallAnalyzer: Send + Sync {
    /// Analyze the staged audio file and return the structured record.
    async fn analyze(
        &self,
        audio_path: &Path,
        mime_type: &str,
    ) -> Result<CallAnalysis, AnalysisError>;
}

/// Ledger backend seam.
#[async_trait::async_trait]
pub trait AnalysisLedger: Send + Sync {
    /// Append one row derived from the analysis.
    async fn append(&self, analysis: &CallAnalysis) -> Result<(), LedgerError>;
}

/// Orchestrator for one audio-to-CRM conversion.
pub struct CallPipeline {
    analyzer: Arc<dyn CallAnalyzer>,
    ledger: Arc<dyn AnalysisLedger>,
}

impl CallPipeline {
    pub fn new(analyzer: Arc<dyn CallAnalyzer>, ledger: Arc<dyn AnalysisLedger>) -> Self {
        Self { analyzer, ledger }
    }

    /// Run one submission through the pipeline.
    ///
    /// Validation failures reject the request before any staging or external
    /// call. After a successful analysis, a ledger failure still returns the
    /// record via [`PipelineOutcome::RecordedNotPersisted`].
    pub async fn run(
        &self,
        submission: AudioSubmission,
    ) -> Result<PipelineOutcome, PipelineError> {
        if submission.bytes.len() > MAX_AUDIO_BYTES {
            return Err(PipelineError::Validation(format!(
                "File too large ({} bytes, max {} bytes)",
                submission.bytes.len(),
                MAX_AUDIO_BYTES
            )));
        }

        let format = AudioFormat::from_file_name(&submission.file_name).ok_or_else(|| {
            PipelineError::Validation(
                "Only .wav, .mp3, and .webm files are supported".to_string(),
            )
        })?;

        let staged = stage_audio(submission.bytes, format.extension()).await?;
        debug!("Staged upload at {}", staged.path().display());

        let analysis = self
            .analyzer
            .analyze(staged.path(), format.mime_type())
            .await
            .map_err(|e| {
                error!("Analysis failed: {}", e);
                e
            })?;

        match self.ledger.append(&analysis).await {
            Ok(()) => Ok(PipelineOutcome::Complete(analysis)),
            Err(e) => {
                error!("Ledger append failed: {}", e);
                Ok(PipelineOutcome::RecordedNotPersisted { analysis, error: e })
            }
        }
    }
}

/// Write the upload to a uniquely named transient file and flush it to disk.
///
/// The returned handle removes the file when dropped, so a partially written
/// file from a failed staging attempt is cleaned up as well.
async fn stage_audio(bytes: Vec<u8>, extension: &'static str) -> Result<NamedTempFile, PipelineError> {
    tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        let mut staged = tempfile::Builder::new()
            .prefix("callscribe-")
            .suffix(extension)
            .tempfile()?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        Ok(staged)
    })
    .await
    .map_err(|e| PipelineError::Staging(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    .map_err(PipelineError::Staging)
}
