//! Algorithm identifiers for JWS and JWE
//!
//! Each enum is closed: parsing an unknown name fails instead of guessing.

use crate::error::JwtError;
use joset_key::derive::Pbkdf2Hash;
use std::fmt;
use std::str::FromStr;

pub use joset_cipher::ContentEncryption;

/// Signature family of a JWS algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFamily {
    /// HMAC with SHA-2
    Hmac,
    /// RSASSA-PKCS1-v1_5 with SHA-2
    Rsa,
    /// ECDSA on the NIST curve matching the digest size
    Ecdsa,
}

/// JWS algorithm (`alg` header value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JwsAlgorithm {
    /// HMAC using SHA-256
    Hs256,
    /// HMAC using SHA-384
    Hs384,
    /// HMAC using SHA-512
    Hs512,
    /// RSASSA-PKCS1-v1_5 using SHA-256
    Rs256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    Rs384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    Rs512,
    /// ECDSA using P-256 and SHA-256
    Es256,
    /// ECDSA using P-384 and SHA-384
    Es384,
    /// ECDSA using P-521 and SHA-512
    Es512,
}

impl JwsAlgorithm {
    /// Every supported algorithm
    pub const ALL: [JwsAlgorithm; 9] = [
        JwsAlgorithm::Hs256,
        JwsAlgorithm::Hs384,
        JwsAlgorithm::Hs512,
        JwsAlgorithm::Rs256,
        JwsAlgorithm::Rs384,
        JwsAlgorithm::Rs512,
        JwsAlgorithm::Es256,
        JwsAlgorithm::Es384,
        JwsAlgorithm::Es512,
    ];

    /// The `alg` header value
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            JwsAlgorithm::Hs256 => "HS256",
            JwsAlgorithm::Hs384 => "HS384",
            JwsAlgorithm::Hs512 => "HS512",
            JwsAlgorithm::Rs256 => "RS256",
            JwsAlgorithm::Rs384 => "RS384",
            JwsAlgorithm::Rs512 => "RS512",
            JwsAlgorithm::Es256 => "ES256",
            JwsAlgorithm::Es384 => "ES384",
            JwsAlgorithm::Es512 => "ES512",
        }
    }

    /// Signature family
    #[must_use]
    pub const fn family(self) -> SignatureFamily {
        match self {
            JwsAlgorithm::Hs256 | JwsAlgorithm::Hs384 | JwsAlgorithm::Hs512 => SignatureFamily::Hmac,
            JwsAlgorithm::Rs256 | JwsAlgorithm::Rs384 | JwsAlgorithm::Rs512 => SignatureFamily::Rsa,
            JwsAlgorithm::Es256 | JwsAlgorithm::Es384 | JwsAlgorithm::Es512 => SignatureFamily::Ecdsa,
        }
    }

    /// Digest size in bits
    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            JwsAlgorithm::Hs256 | JwsAlgorithm::Rs256 | JwsAlgorithm::Es256 => 256,
            JwsAlgorithm::Hs384 | JwsAlgorithm::Rs384 | JwsAlgorithm::Es384 => 384,
            JwsAlgorithm::Hs512 | JwsAlgorithm::Rs512 | JwsAlgorithm::Es512 => 512,
        }
    }

    /// Minimum HMAC key length in bytes
    #[must_use]
    pub const fn min_hmac_key_len(self) -> usize {
        self.bits() / 8
    }

    /// Width in bytes of one ECDSA signature component
    #[must_use]
    pub const fn ecdsa_component_size(self) -> usize {
        match self.bits() {
            256 => 32,
            384 => 48,
            _ => 66,
        }
    }
}

impl fmt::Display for JwsAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JwsAlgorithm {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JwsAlgorithm::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| JwtError::UnrecognizedAlgorithm(s.to_string()))
    }
}

/// JWE key management algorithm (`alg` header value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyManagement {
    /// Direct use of a shared symmetric key as the CEK
    Dir,
    /// RSAES-OAEP with SHA-1 and MGF1-SHA-1
    RsaOaep,
    /// AES-128 key wrap
    A128Kw,
    /// AES-192 key wrap
    A192Kw,
    /// AES-256 key wrap
    A256Kw,
    /// PBES2 with HMAC-SHA-256 and AES-128 key wrap
    Pbes2Hs256A128Kw,
    /// PBES2 with HMAC-SHA-384 and AES-192 key wrap
    Pbes2Hs384A192Kw,
    /// PBES2 with HMAC-SHA-512 and AES-256 key wrap
    Pbes2Hs512A256Kw,
}

impl KeyManagement {
    /// Every supported algorithm
    pub const ALL: [KeyManagement; 8] = [
        KeyManagement::Dir,
        KeyManagement::RsaOaep,
        KeyManagement::A128Kw,
        KeyManagement::A192Kw,
        KeyManagement::A256Kw,
        KeyManagement::Pbes2Hs256A128Kw,
        KeyManagement::Pbes2Hs384A192Kw,
        KeyManagement::Pbes2Hs512A256Kw,
    ];

    /// The `alg` header value
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            KeyManagement::Dir => "dir",
            KeyManagement::RsaOaep => "RSA-OAEP",
            KeyManagement::A128Kw => "A128KW",
            KeyManagement::A192Kw => "A192KW",
            KeyManagement::A256Kw => "A256KW",
            KeyManagement::Pbes2Hs256A128Kw => "PBES2-HS256+A128KW",
            KeyManagement::Pbes2Hs384A192Kw => "PBES2-HS384+A192KW",
            KeyManagement::Pbes2Hs512A256Kw => "PBES2-HS512+A256KW",
        }
    }

    /// AES key wrap KEK size in bits, for the `A*KW` and PBES2 modes
    #[must_use]
    pub const fn kw_bits(self) -> Option<usize> {
        match self {
            KeyManagement::A128Kw | KeyManagement::Pbes2Hs256A128Kw => Some(128),
            KeyManagement::A192Kw | KeyManagement::Pbes2Hs384A192Kw => Some(192),
            KeyManagement::A256Kw | KeyManagement::Pbes2Hs512A256Kw => Some(256),
            KeyManagement::Dir | KeyManagement::RsaOaep => None,
        }
    }

    /// PBKDF2 PRF for the PBES2 modes
    #[must_use]
    pub const fn pbes2_hash(self) -> Option<Pbkdf2Hash> {
        match self {
            KeyManagement::Pbes2Hs256A128Kw => Some(Pbkdf2Hash::Sha256),
            KeyManagement::Pbes2Hs384A192Kw => Some(Pbkdf2Hash::Sha384),
            KeyManagement::Pbes2Hs512A256Kw => Some(Pbkdf2Hash::Sha512),
            _ => None,
        }
    }

    /// `true` for the password based modes
    #[must_use]
    pub const fn is_pbes2(self) -> bool {
        self.pbes2_hash().is_some()
    }
}

impl fmt::Display for KeyManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyManagement {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyManagement::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| JwtError::UnrecognizedKeyManagement(s.to_string()))
    }
}

/// Parse an `enc` value with the crate's error type
pub(crate) fn parse_content_encryption(enc: &str) -> Result<ContentEncryption, JwtError> {
    enc.parse()
        .map_err(|_| JwtError::UnrecognizedContentEncryption(enc.to_string()))
}
