//! Error handling for the cipher crate

use thiserror::Error;

/// Cipher-specific errors
#[derive(Debug, Error)]
pub enum CipherError {
    /// Encryption operation failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Decryption operation failed, including authentication tag mismatch
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// RFC 3394 integrity check value mismatch
    #[error("Key unwrapping failed")]
    KeyUnwrap,

    /// Key wrap input with an unusable length
    #[error("Invalid key wrap input: {0}")]
    InvalidWrapInput(String),

    /// Invalid key length provided
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Invalid IV / nonce length provided
    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Expected nonce length in bytes
        expected: usize,
        /// Actual nonce length in bytes
        actual: usize,
    },

    /// Unsupported cryptographic algorithm
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Result type for cipher operations
pub type Result<T> = std::result::Result<T, CipherError>;
