//! Structured analysis of one sales call
//!
//! `CallAnalysis` is the record derived from a single audio submission by the
//! inference backend. It is immutable once constructed and is consumed by the
//! ledger client to build the persisted spreadsheet row.

use serde::{Deserialize, Serialize};

/// Urgency scores above this threshold mark the call as urgent in the ledger.
pub const URGENT_THRESHOLD: i64 = 7;

/// Structured CRM fields derived from one sales-call recording.
///
/// All fields default to empty/zero when the model omits them; unknown fields
/// in the model output are ignored. `sentiment` is documented as one of
/// "positive", "neutral", "negative" but is passed through without validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallAnalysis {
    /// Brief summary of the conversation (may be empty)
    #[serde(default)]
    pub summary: String,
    /// Ordered follow-up actions (may be empty)
    #[serde(default)]
    pub action_items: Vec<String>,
    /// Overall sentiment label, pass-through from the model
    #[serde(default)]
    pub sentiment: String,
    /// Urgency from 1 (low) to 10 (high), clamped after parsing
    #[serde(default)]
    pub urgency_score: i64,
    /// Name of the client or contact mentioned (may be empty)
    #[serde(default)]
    pub client_name: String,
}

impl CallAnalysis {
    /// Whether this call should be flagged urgent in the ledger.
    pub fn is_urgent(&self) -> bool {
        self.urgency_score > URGENT_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgent_above_threshold_only() {
        let mut analysis = CallAnalysis {
            urgency_score: 9,
            ..Default::default()
        };
        assert!(analysis.is_urgent());

        analysis.urgency_score = 7;
        assert!(!analysis.is_urgent(), "threshold itself is not urgent");
    }
}
