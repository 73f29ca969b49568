//! Configuration resolution for callscribe
//!
//! All three backend settings come from the environment (a `.env` file is
//! loaded best-effort first). Every value is required; a missing one is fatal
//! at startup, before the pipeline ever runs.

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Application configuration from environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the Gemini inference backend
    pub gemini_api_key: String,
    /// Target spreadsheet identifier for the ledger
    pub spreadsheet_id: String,
    /// OAuth2 bearer token for the Sheets API (spreadsheets scope)
    pub sheets_access_token: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            gemini_api_key: require("GEMINI_API_KEY")?,
            spreadsheet_id: require("SPREADSHEET_ID")?,
            sheets_access_token: require("SHEETS_ACCESS_TOKEN")?,
        })
    }
}

/// Read a required environment variable, rejecting empty/whitespace values.
fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(name))
}
