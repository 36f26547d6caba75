//! Logging helpers with secure handling of key material
//!
//! The engine itself logs through the `log` facade (directly or via
//! `tracing`'s `log` feature). Applications pick the backend; these helpers
//! cover the `env_logger` setup used by binaries and tests.

use log::{error, info};
use sha2::{Digest, Sha256};
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// `env_logger` bootstrap and safe formatting of sensitive values
pub struct LoggingTransformer;

impl LoggingTransformer {
    /// Initialize logging once at application startup
    ///
    /// Levels come from `RUST_LOG`, e.g. `RUST_LOG=joset_jwt=debug`.
    pub fn init() {
        INIT_LOGGER.call_once(|| {
            env_logger::Builder::from_default_env()
                .format_timestamp_micros()
                .init();

            info!("Structured logging initialized");
        });
    }

    /// Initialize logging for test environments
    ///
    /// Safe to call from every test; later calls are ignored.
    pub fn init_test() {
        let _ = env_logger::Builder::from_default_env()
            .is_test(true)
            .try_init();
    }

    /// Log a failed cryptographic operation without its payload
    pub fn log_crypto_error(operation: &str, error: &dyn std::error::Error) {
        error!(
            "Cryptographic operation failed: {} (error_type: {})",
            operation,
            std::any::type_name_of_val(error)
        );
    }

    /// Short SHA-256 fingerprint of key material, safe to log
    ///
    /// Returns `#` followed by the first 12 hex characters of the digest.
    #[must_use]
    pub fn key_fingerprint(key: impl AsRef<[u8]>) -> String {
        let hex_hash = hex::encode(Sha256::digest(key.as_ref()));
        format!("#{}", &hex_hash[..12])
    }
}
