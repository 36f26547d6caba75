//! # Joset JWT
//!
//! Compact JWS and JWE tokens carrying a JSON claim set.
//!
//! ## Features
//!
//! - **JWS**: HS256/384/512, RS256/384/512, ES256/384/512
//! - **JWE key management**: `dir`, `A128KW`/`A192KW`/`A256KW`, `RSA-OAEP`,
//!   `PBES2-HS256+A128KW`/`PBES2-HS384+A192KW`/`PBES2-HS512+A256KW`
//! - **JWE content encryption**: AES-GCM and AES-CBC-HMAC-SHA2
//! - **Claim checks**: `aud` / `iss` allow-lists, `iat`, `exp` and a lifetime bound
//! - **True Async**: PBES2 derivation on the blocking pool, channel-backed futures
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use joset_jwt::{KeyRef, generate_jwe, parse};
//! use serde_json::json;
//!
//! let key = KeyRef::from("correct horse battery staple");
//! let token = generate_jwe("PBES2-HS256+A128KW", "A128GCM", &json!({ "aud": "api" }), &key, None)?;
//!
//! let verified = parse(&token)
//!     .set_algorithm_lists("PBES2-HS256+A128KW", "A128GCM")
//!     .set_audience("api")
//!     .verify(&key);
//! assert!(verified.is_valid());
//! # Ok::<(), joset_jwt::JwtError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod algorithms;
pub mod claims;
pub mod config;
mod crypto;
mod engine;
pub mod error;
pub mod futures;
mod jwe;
mod jws;
pub mod token;

pub use algorithms::{ContentEncryption, JwsAlgorithm, KeyManagement, SignatureFamily};
pub use claims::{AllowList, Outcome, Policy};
pub use config::{Clock, JoseConfig, Pbes2Config};
pub use crypto::ecdsa_der;
pub use engine::{Jose, generate_jwe, generate_jwe_async, generate_jws, parse};
pub use error::{JwtError, JwtResult, TokenError};
pub use futures::{TokenGenerationFuture, TokenVerificationFuture};
pub use token::{ParsedToken, TokenType, VerifiedToken};

// Key types, so callers need no direct dependency on joset_key
pub use joset_key::{KeyMaterial, KeyRef};
