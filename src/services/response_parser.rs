//! Model response normalizer
//!
//! The inference backend is instructed to return bare JSON, but in practice
//! wraps it in a markdown code fence often enough that the output has to be
//! unwrapped before decoding. This module strips that envelope with an
//! explicit parser over the documented grammar rather than a regex, so the
//! accepted shapes stay auditable:
//!
//! ```text
//! envelope   := ws* fence-open? tag? newline? payload fence-close? ws*
//! fence-open := "```"
//! tag        := "json"
//! ```
//!
//! If no envelope is present the whole text is treated as the payload.

use thiserror::Error;

use crate::models::CallAnalysis;

const FENCE: &str = "```";
const LANG_TAG: &str = "json";

/// Normalizer errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// Payload did not decode into an analysis record
    #[error("Malformed analysis payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse raw model output into a [`CallAnalysis`].
///
/// Strips the optional markdown envelope, decodes the payload, and clamps
/// `urgency_score` into [1, 10]. Missing fields take their defaults; unknown
/// fields are ignored. A payload that fails to decode is a fatal error — no
/// partial record is returned.
pub fn parse_analysis(raw: &str) -> Result<CallAnalysis, ParseError> {
    let payload = strip_fenced_envelope(raw);
    let mut analysis: CallAnalysis = serde_json::from_str(payload)?;
    analysis.urgency_score = analysis.urgency_score.clamp(1, 10);
    Ok(analysis)
}

/// Strip the optional fenced-markdown envelope from model output.
///
/// Each grammar element is optional and consumed independently, so bare JSON,
/// a fence without a language tag, and a tag without a fence all normalize to
/// the inner payload. The close fence is anchored at the end of the text.
fn strip_fenced_envelope(text: &str) -> &str {
    let mut payload = text.trim();

    if let Some(rest) = payload.strip_suffix(FENCE) {
        payload = rest.trim_end();
    }
    if let Some(rest) = payload.strip_prefix(FENCE) {
        payload = rest;
    }
    if let Some(rest) = payload.strip_prefix(LANG_TAG) {
        payload = rest;
    }

    payload.trim_start()
}
