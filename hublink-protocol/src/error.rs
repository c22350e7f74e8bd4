//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur during framing or message decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("incomplete message: frame does not end with the record separator")]
    IncompleteMessage,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid UTF-8 in record")]
    InvalidUtf8,
}
