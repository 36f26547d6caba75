//! Error handling for key material

use thiserror::Error;

/// Key-specific errors
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key text or bytes could not be decoded
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Key decoded but is unusable for the requested operation
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// No usable keystore entry for the requested identifier
    #[error("Invalid key identifier")]
    UnknownKeyId(Option<String>),

    /// Key derivation error occurred
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Encryption operation failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption operation failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

impl KeyError {
    /// Create an `InvalidKey` error
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Create an `InvalidKeyFormat` error
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidKeyFormat(msg.into())
    }
}

/// Result type for key operations
pub type Result<T> = std::result::Result<T, KeyError>;
