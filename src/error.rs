// Error types shared by the store, the drafts and the AI gateway
// Binaries wrap these in anyhow; the library keeps them typed

use thiserror::Error;

// ============================================================================
// STORE ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend failure (SQLite, I/O)
    #[error("storage failure: {0}")]
    Storage(String),

    /// The persisted blob exists but does not decode
    #[error("stored data under key '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize shipments: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("shipment not found: {id}")]
    NotFound { id: String },

    /// Shipment rejected by upsert (no events, or status out of sync)
    #[error("invalid shipment {id}: {reason}")]
    Invariant { id: String, reason: String },

    #[error(transparent)]
    Draft(#[from] DraftError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// DRAFT ERRORS
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("required field is empty: {0}")]
    MissingField(&'static str),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("unknown shipment status '{0}'")]
    UnknownStatus(String),
}

// ============================================================================
// AI GATEWAY ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum GatewayError {
    /// No service credential configured
    #[error("AI API key not configured")]
    NotConfigured,

    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("AI service returned no text")]
    EmptyResponse,

    /// Body came back but is not the JSON shape we asked for
    #[error("AI response is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}
