//! Google Sheets ledger client
//!
//! Appends one row per completed analysis to a fixed range of a
//! pre-configured spreadsheet. Append is add-only; nothing in this service
//! updates or deletes existing rows, and no failure is retried.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::models::CallAnalysis;
use crate::services::pipeline::AnalysisLedger;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Target range within the configured spreadsheet
const APPEND_RANGE: &str = "Sheet1!A:F";

/// Timeout for one append operation
const APPEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Ledger client errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Request could not be sent or the response not read
    #[error("Ledger append failed: {0}")]
    Network(String),

    /// Backend rejected the append (auth, quota, bad range)
    #[error("Ledger append rejected: HTTP {0}: {1}")]
    Api(u16, String),

    /// Append exceeded its timeout
    #[error("Ledger append timed out after {0:?}")]
    Timeout(Duration),
}

/// Client appending analysis rows to the spreadsheet ledger.
pub struct SheetsClient {
    http: Client,
    access_token: String,
    spreadsheet_id: String,
    base_url: String,
}

impl SheetsClient {
    /// Create a new client for one fixed spreadsheet.
    ///
    /// `access_token` is an OAuth2 bearer token with spreadsheets scope;
    /// acquiring and refreshing it is the deployment's concern.
    pub fn new(access_token: String, spreadsheet_id: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(APPEND_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            access_token,
            spreadsheet_id,
            base_url: SHEETS_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (local emulators).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn append_row(&self, row: Vec<Value>) -> Result<(), LedgerError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.base_url, self.spreadsheet_id, APPEND_RANGE
        );

        let response = self
            .http
            .post(&url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Api(status.as_u16(), body));
        }

        debug!("Appended analysis row to {}", APPEND_RANGE);
        Ok(())
    }
}

#[async_trait::async_trait]
impl AnalysisLedger for SheetsClient {
    async fn append(&self, analysis: &CallAnalysis) -> Result<(), LedgerError> {
        let row = ledger_row(analysis, &Utc::now().to_rfc3339());
        tokio::time::timeout(APPEND_TIMEOUT, self.append_row(row))
            .await
            .map_err(|_| LedgerError::Timeout(APPEND_TIMEOUT))?
    }
}

/// Build one ledger row:
/// Timestamp | Client | Summary | Sentiment | Urgency | Urgent ("Yes"/"No").
///
/// Urgency stays numeric so the backend interprets it as a number under
/// USER_ENTERED semantics.
fn ledger_row(analysis: &CallAnalysis, timestamp: &str) -> Vec<Value> {
    let urgent = if analysis.is_urgent() { "Yes" } else { "No" };
    vec![
        json!(timestamp),
        json!(analysis.client_name),
        json!(analysis.summary),
        json!(analysis.sentiment),
        json!(analysis.urgency_score),
        json!(urgent),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis_with_urgency(urgency_score: i64) -> CallAnalysis {
        CallAnalysis {
            summary: "Quarterly renewal call".to_string(),
            action_items: vec!["Send proposal".to_string()],
            sentiment: "positive".to_string(),
            urgency_score,
            client_name: "Acme".to_string(),
        }
    }

    #[test]
    fn row_layout_matches_ledger_columns() {
        let row = ledger_row(&analysis_with_urgency(5), "2026-08-07T12:00:00+00:00");
        assert_eq!(row.len(), 6);
        assert_eq!(row[0], json!("2026-08-07T12:00:00+00:00"));
        assert_eq!(row[1], json!("Acme"));
        assert_eq!(row[2], json!("Quarterly renewal call"));
        assert_eq!(row[3], json!("positive"));
        assert_eq!(row[4], json!(5));
    }

    #[test]
    fn urgent_flag_set_above_seven() {
        let row = ledger_row(&analysis_with_urgency(9), "ts");
        assert_eq!(row[5], json!("Yes"));
    }

    #[test]
    fn urgent_flag_clear_at_seven() {
        let row = ledger_row(&analysis_with_urgency(7), "ts");
        assert_eq!(row[5], json!("No"));
    }
}
