//! Error types for tripledger

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Upstream service answered with a non-success status
    #[error("Upstream API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether a retry could plausibly succeed (429, 5xx, network or timeout)
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            Error::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status()
                        .is_some_and(|s| s.as_u16() == 429 || s.is_server_error())
            }
            Error::Timeout(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
