//! Error types for the shared codecs

use thiserror::Error;

/// Decoding failure for base64 / base64url input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid base64 input: {0}")]
pub struct DecodeError(pub String);

impl From<base64::DecodeError> for DecodeError {
    fn from(err: base64::DecodeError) -> Self {
        DecodeError(err.to_string())
    }
}

/// Result type for the shared codecs
pub type Result<T> = std::result::Result<T, DecodeError>;
