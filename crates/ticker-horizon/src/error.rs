//! Upstream client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HorizonError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed pagination link: {0}")]
    MalformedLink(String),

    #[error("Metadata document parse error: {0}")]
    MetadataParse(String),

    #[error("Metadata document exceeds {0} bytes")]
    MetadataTooLarge(usize),

    #[error("Event stream error: {0}")]
    Stream(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HorizonError {
    /// True for HTTP 429, 5xx responses, connect failures and timeouts.
    pub fn is_retryable(&self) -> bool {
        match self {
            HorizonError::Status { status, .. } => *status == 429 || *status >= 500,
            HorizonError::Request(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

pub type HorizonResult<T> = Result<T, HorizonError>;
