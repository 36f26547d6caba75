//! Error types for token generation and verification
//!
//! Two channels never mix: [`JwtError`] is returned from generation calls
//! that were misused, while [`TokenError`] is the verification outcome
//! attached to a token and is never raised as an `Err`.

use joset_cipher::CipherError;
use joset_common::DecodeError;
use joset_key::KeyError;
use std::fmt;
use thiserror::Error;

/// JWT operation result type
pub type JwtResult<T> = Result<T, JwtError>;

/// Construction-time errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// Payload does not serialize to a JSON object
    InvalidPayload,
    /// Keystore has no entry for the requested key identifier
    InvalidKeyId,
    /// Unknown JWS algorithm
    UnrecognizedAlgorithm(String),
    /// Unknown JWE key management algorithm
    UnrecognizedKeyManagement(String),
    /// Unknown JWE content encryption algorithm
    UnrecognizedContentEncryption(String),
    /// Key cannot be used with the algorithm
    InvalidKey(String),
    /// Serialization failed
    Serialization(String),
    /// Cryptographic operation failed
    Crypto(String),
    /// Background task failed before producing a result
    TaskJoinError,
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JwtError::InvalidPayload => write!(f, "Invalid payload"),
            JwtError::InvalidKeyId => write!(f, "Invalid key identifier"),
            JwtError::UnrecognizedAlgorithm(_) => write!(f, "Unrecognized algorithm"),
            JwtError::UnrecognizedKeyManagement(_) => {
                write!(f, "Unrecognized key management algorithm")
            }
            JwtError::UnrecognizedContentEncryption(_) => {
                write!(f, "Unrecognized content encryption algorithm")
            }
            JwtError::InvalidKey(msg) => write!(f, "Invalid key: {msg}"),
            JwtError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            JwtError::Crypto(msg) => write!(f, "Cryptographic operation failed: {msg}"),
            JwtError::TaskJoinError => write!(f, "Background task failed"),
        }
    }
}

impl std::error::Error for JwtError {}

impl JwtError {
    /// Create an invalid key error
    #[inline]
    #[must_use]
    pub fn invalid_key(msg: &str) -> Self {
        JwtError::InvalidKey(msg.to_string())
    }

    /// Create a serialization error
    #[inline]
    #[must_use]
    pub fn serialization(msg: &str) -> Self {
        JwtError::Serialization(msg.to_string())
    }
}

impl From<KeyError> for JwtError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::UnknownKeyId(_) => JwtError::InvalidKeyId,
            KeyError::EncryptionFailed(msg)
            | KeyError::DecryptionFailed(msg)
            | KeyError::KeyDerivation(msg) => JwtError::Crypto(msg),
            other => JwtError::InvalidKey(other.to_string()),
        }
    }
}

impl From<CipherError> for JwtError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::InvalidKeyLength { .. } => JwtError::InvalidKey(err.to_string()),
            other => JwtError::Crypto(other.to_string()),
        }
    }
}

impl From<DecodeError> for JwtError {
    fn from(err: DecodeError) -> Self {
        JwtError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for JwtError {
    fn from(err: serde_json::Error) -> Self {
        JwtError::Serialization(err.to_string())
    }
}

/// Verification-time failure attached to a token
///
/// `Display` yields the descriptor message of the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Segment count is neither 3 nor 5
    #[error("Invalid token")]
    InvalidToken,
    /// Header segment is not a base64url JSON object
    #[error("Non parsable header. {0}")]
    NonParsableHeader(String),
    /// Payload is not a base64url JSON object
    #[error("Non parsable payload. {0}")]
    NonParsablePayload(String),
    /// `alg` header missing or not a string
    #[error("Missing or invalid alg claim in header")]
    MissingAlg,
    /// Unknown JWS algorithm
    #[error("Unrecognized algorithm {0}")]
    UnrecognizedAlgorithm(String),
    /// JWS algorithm outside the allow-list
    #[error("Unwanted algorithm {0}")]
    UnwantedAlgorithm(String),
    /// `enc` header missing or not a string
    #[error("Missing or invalid enc claim in header")]
    MissingEnc,
    /// Unknown JWE key management algorithm
    #[error("Unrecognized key management algorithm {0}")]
    UnrecognizedKeyManagement(String),
    /// JWE key management algorithm outside the allow-list
    #[error("Unwanted key management algorithm {0}")]
    UnwantedKeyManagement(String),
    /// Unknown JWE content encryption algorithm
    #[error("Unrecognized content encryption algorithm {0}")]
    UnrecognizedContentEncryption(String),
    /// JWE content encryption algorithm outside the allow-list
    #[error("Unwanted content encryption algorithm {0}")]
    UnwantedContentEncryption(String),
    /// `p2c` missing, not an integer, or out of range
    #[error("Missing or invalid p2c claim in header")]
    InvalidP2c,
    /// `p2c` above the synchronous ceiling
    #[error("p2c value too large for synchronous mode")]
    P2cTooLargeForSync,
    /// `p2s` missing or not base64url
    #[error("Missing or invalid p2s claim in header")]
    InvalidP2s,
    /// Keystore verification without a `kid` header
    #[error("Missing kid claim in header")]
    MissingKid,
    /// Keystore has no entry for the header `kid`
    #[error("Key with id not found")]
    KeyNotFound {
        /// The `kid` taken from the header
        kid: String,
    },
    /// Any JWS signature failure
    #[error("Integrity check failed")]
    IntegrityCheckFailed,
    /// Any JWE key recovery or content decryption failure
    #[error("Could not decrypt token")]
    DecryptionFailed,
    /// Audience allow-list set but `aud` absent
    #[error("Missing aud claim in payload")]
    MissingAudience,
    /// `aud` not in the audience allow-list
    #[error("Mismatching aud claim in payload")]
    MismatchingAudience,
    /// Issuer allow-list set but `iss` absent
    #[error("Missing iss claim in payload")]
    MissingIssuer,
    /// `iss` not in the issuer allow-list
    #[error("Mismatching iss claim in payload")]
    MismatchingIssuer,
    /// `iat` missing or not a positive number
    #[error("Missing or invalid iat claim in payload")]
    InvalidIat,
}

impl TokenError {
    /// Key identifier carried by [`TokenError::KeyNotFound`]
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        match self {
            TokenError::KeyNotFound { kid } => Some(kid),
            _ => None,
        }
    }

    /// Descriptor message, same as `to_string()`
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_messages() {
        assert_eq!(JwtError::InvalidPayload.to_string(), "Invalid payload");
        assert_eq!(JwtError::InvalidKeyId.to_string(), "Invalid key identifier");
        assert_eq!(
            JwtError::UnrecognizedAlgorithm("XS256".into()).to_string(),
            "Unrecognized algorithm"
        );
    }

    #[test]
    fn key_errors_convert() {
        assert_eq!(JwtError::from(KeyError::UnknownKeyId(None)), JwtError::InvalidKeyId);
        assert!(matches!(
            JwtError::from(KeyError::invalid_format("bad")),
            JwtError::InvalidKey(_)
        ));
        assert!(matches!(
            JwtError::from(CipherError::InvalidKeyLength { expected: 16, actual: 3 }),
            JwtError::InvalidKey(_)
        ));
    }

    #[test]
    fn token_error_messages() {
        assert_eq!(
            TokenError::UnwantedAlgorithm("HS256".into()).to_string(),
            "Unwanted algorithm HS256"
        );
        assert_eq!(
            TokenError::NonParsableHeader("EOF while parsing".into()).to_string(),
            "Non parsable header. EOF while parsing"
        );
        let missing = TokenError::KeyNotFound { kid: "k1".into() };
        assert_eq!(missing.message(), "Key with id not found");
        assert_eq!(missing.kid(), Some("k1"));
        assert_eq!(TokenError::InvalidIat.kid(), None);
    }
}
