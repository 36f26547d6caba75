//! PBES2 key derivation (RFC 7518 §4.8)
//!
//! PBKDF2 with HMAC-SHA-256/384/512 stretches a password into an AES key
//! wrap KEK.

use crate::error::{KeyError, Result};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha384, Sha512};
use std::num::NonZeroU32;
use zeroize::Zeroizing;

/// PRF digest used by PBKDF2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pbkdf2Hash {
    /// HMAC-SHA-256
    Sha256,
    /// HMAC-SHA-384
    Sha384,
    /// HMAC-SHA-512
    Sha512,
}

/// PBKDF2 parameters for one derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Params {
    /// PRF digest
    pub hash: Pbkdf2Hash,
    /// Iteration count, must be non-zero
    pub iterations: u32,
    /// Derived key length in bytes
    pub output_size: usize,
}

/// Derive a key from `password` and `salt`
///
/// The result is zeroized on drop.
///
/// # Errors
///
/// Returns `KeyDerivation` for a zero iteration count or output size.
pub fn pbkdf2(password: &[u8], salt: &[u8], params: &Pbkdf2Params) -> Result<Zeroizing<Vec<u8>>> {
    let iterations = NonZeroU32::new(params.iterations)
        .ok_or_else(|| KeyError::KeyDerivation("PBKDF2 iterations must be non-zero".into()))?;
    if params.output_size == 0 {
        return Err(KeyError::KeyDerivation("PBKDF2 output size must be non-zero".into()));
    }

    let mut output = Zeroizing::new(vec![0u8; params.output_size]);
    match params.hash {
        Pbkdf2Hash::Sha256 => pbkdf2_hmac::<Sha256>(password, salt, iterations.get(), &mut output),
        Pbkdf2Hash::Sha384 => pbkdf2_hmac::<Sha384>(password, salt, iterations.get(), &mut output),
        Pbkdf2Hash::Sha512 => pbkdf2_hmac::<Sha512>(password, salt, iterations.get(), &mut output),
    }
    tracing::trace!(
        hash = ?params.hash,
        iterations = params.iterations,
        "derived PBES2 key encryption key"
    );
    Ok(output)
}
