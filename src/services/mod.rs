//! Service modules for the audio-to-CRM pipeline

pub mod gemini_client;
pub mod pipeline;
pub mod response_parser;
pub mod sheets_client;

pub use gemini_client::{AnalysisError, GeminiClient};
pub use pipeline::{
    AnalysisLedger, AudioFormat, AudioSubmission, CallAnalyzer, CallPipeline, PipelineError,
    PipelineOutcome, MAX_AUDIO_BYTES,
};
pub use response_parser::{parse_analysis, ParseError};
pub use sheets_client::{LedgerError, SheetsClient};
