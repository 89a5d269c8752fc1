//! Error types for importer-client
//!
//! Transport errors are never returned from coordinator operations; they are
//! published as failure events instead.

use thiserror::Error;

/// Site imports API transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload interrupted through its abort token
    #[error("Upload aborted")]
    Aborted,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Parse(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Result type for transport calls
pub type TransportResult<T> = Result<T, TransportError>;
