//! AES Key Wrap (RFC 3394)
//!
//! Used by the `A*KW` and `PBES2-*` key management modes to protect a content
//! encryption key under a key encryption key (KEK).

use crate::error::{CipherError, Result};
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray};
use aes::{Aes128, Aes192, Aes256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Default initial value from RFC 3394 §2.2.3.1
const DEFAULT_IV: [u8; 8] = [0xA6; 8];

const ROUNDS: u64 = 6;

enum Kek {
    A128(Aes128),
    A192(Aes192),
    A256(Aes256),
}

impl Kek {
    /// Build the block cipher from the first `bits / 8` bytes of `kek`
    fn new(kek: &[u8], bits: usize) -> Result<Self> {
        let len = bits / 8;
        if kek.len() < len {
            return Err(CipherError::InvalidKeyLength {
                expected: len,
                actual: kek.len(),
            });
        }
        let key = &kek[..len];
        let invalid = |_| CipherError::InvalidKeyLength {
            expected: len,
            actual: kek.len(),
        };
        match bits {
            128 => Aes128::new_from_slice(key).map(Kek::A128).map_err(invalid),
            192 => Aes192::new_from_slice(key).map(Kek::A192).map_err(invalid),
            256 => Aes256::new_from_slice(key).map(Kek::A256).map_err(invalid),
            other => Err(CipherError::UnsupportedAlgorithm(format!(
                "AES key wrap with {other}-bit KEK"
            ))),
        }
    }

    fn encrypt(&self, block: &mut [u8; 16]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Kek::A128(c) => c.encrypt_block(block),
            Kek::A192(c) => c.encrypt_block(block),
            Kek::A256(c) => c.encrypt_block(block),
        }
    }

    fn decrypt(&self, block: &mut [u8; 16]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Kek::A128(c) => c.decrypt_block(block),
            Kek::A192(c) => c.decrypt_block(block),
            Kek::A256(c) => c.decrypt_block(block),
        }
    }
}

/// Wrap `cek` under the first `kek_bits / 8` bytes of `kek`
///
/// # Errors
///
/// Fails when the KEK is shorter than `kek_bits / 8` bytes, when `kek_bits`
/// is not 128, 192 or 256, or when the CEK is not a multiple of 8 bytes of at
/// least 16 bytes.
pub fn wrap(kek: &[u8], cek: &[u8], kek_bits: usize) -> Result<Vec<u8>> {
    if cek.len() % 8 != 0 || cek.len() < 16 {
        return Err(CipherError::InvalidWrapInput(format!(
            "key to wrap must be a multiple of 8 bytes and at least 16 bytes, got {}",
            cek.len()
        )));
    }
    let cipher = Kek::new(kek, kek_bits)?;
    let n = cek.len() / 8;

    let mut a = DEFAULT_IV;
    let mut r: Vec<[u8; 8]> = cek
        .chunks_exact(8)
        .map(|c| {
            let mut block = [0u8; 8];
            block.copy_from_slice(c);
            block
        })
        .collect();

    let mut b = [0u8; 16];
    for j in 0..ROUNDS {
        for (i, ri) in r.iter_mut().enumerate() {
            b[..8].copy_from_slice(&a);
            b[8..].copy_from_slice(ri);
            cipher.encrypt(&mut b);

            let t = j * n as u64 + i as u64 + 1;
            a.copy_from_slice(&b[..8]);
            xor_counter(&mut a, t);
            ri.copy_from_slice(&b[8..]);
        }
    }
    b.zeroize();

    let mut out = Vec::with_capacity(8 * (n + 1));
    out.extend_from_slice(&a);
    for ri in &mut r {
        out.extend_from_slice(ri);
        ri.zeroize();
    }
    Ok(out)
}

/// Unwrap `wrapped` with the first `kek_bits / 8` bytes of `kek`
///
/// # Errors
///
/// Returns [`CipherError::KeyUnwrap`] when the integrity check value does not
/// match, and input errors for malformed lengths.
pub fn unwrap(kek: &[u8], wrapped: &[u8], kek_bits: usize) -> Result<Vec<u8>> {
    if wrapped.len() % 8 != 0 || wrapped.len() < 24 {
        return Err(CipherError::InvalidWrapInput(format!(
            "wrapped key must be a multiple of 8 bytes and at least 24 bytes, got {}",
            wrapped.len()
        )));
    }
    let cipher = Kek::new(kek, kek_bits)?;
    let n = wrapped.len() / 8 - 1;

    let mut a = [0u8; 8];
    a.copy_from_slice(&wrapped[..8]);
    let mut r: Vec<[u8; 8]> = wrapped[8..]
        .chunks_exact(8)
        .map(|c| {
            let mut block = [0u8; 8];
            block.copy_from_slice(c);
            block
        })
        .collect();

    let mut b = [0u8; 16];
    for j in (0..ROUNDS).rev() {
        for (i, ri) in r.iter_mut().enumerate().rev() {
            let t = j * n as u64 + i as u64 + 1;
            xor_counter(&mut a, t);
            b[..8].copy_from_slice(&a);
            b[8..].copy_from_slice(ri);
            cipher.decrypt(&mut b);

            a.copy_from_slice(&b[..8]);
            ri.copy_from_slice(&b[8..]);
        }
    }
    b.zeroize();

    let mut cek: Vec<u8> = r.iter().flatten().copied().collect();
    r.zeroize();

    if bool::from(a[..].ct_eq(&DEFAULT_IV[..])) {
        Ok(cek)
    } else {
        cek.zeroize();
        tracing::trace!("AES key unwrap integrity check failed");
        Err(CipherError::KeyUnwrap)
    }
}

#[inline]
fn xor_counter(a: &mut [u8; 8], t: u64) {
    for (x, y) in a.iter_mut().zip(t.to_be_bytes()) {
        *x ^= y;
    }
}
