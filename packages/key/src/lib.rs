//! # Joset Key
//!
//! Key material handling for the joset token engine: tagged key material and
//! keystores, PEM decoding for RSA / EC keys and certificates, RSA-OAEP key
//! transport, and PBKDF2 derivation for PBES2.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod derive;
pub mod error;
pub mod material;
pub mod pem;
pub mod rsa_oaep;

pub use error::{KeyError, Result};
pub use material::{KeyMaterial, KeyRef};

// Re-export key types so callers do not need direct curve / rsa dependencies
pub use rsa::{RsaPrivateKey, RsaPublicKey};
