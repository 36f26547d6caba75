//! # Joset Cipher
//!
//! Symmetric primitives behind JWE: RFC 3394 AES key wrap for the `A*KW`
//! and `PBES2-*` key management modes, and the AES-GCM / AES-CBC-HMAC
//! content encryption methods.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod content;
pub mod error;
pub mod key_wrap;

pub use content::{ContentEncryption, Sealed};
pub use error::{CipherError, Result};
