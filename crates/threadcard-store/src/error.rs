//! Error types for the record-store boundary.

use threadcard_core::ThreadcardError;

/// Errors from talking to the record store or interpreting its payloads.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("no collection id found in URL: {0}")]
    InvalidUrl(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("malformed store payload: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether this failure means the store could not be reached or used at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::InvalidUrl(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl From<StoreError> for ThreadcardError {
    fn from(err: StoreError) -> Self {
        ThreadcardError::Store(err.to_string())
    }
}
