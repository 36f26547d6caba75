//! Common infrastructure shared by the joset crates
//!
//! This crate provides:
//! - The unpadded, URL-safe base64 codec used by every compact token segment
//! - Logging helpers that never expose secret material

#![forbid(unsafe_code)]

pub mod base64url;
pub mod error;
pub mod logging;

pub use error::{DecodeError, Result};
pub use logging::LoggingTransformer;
