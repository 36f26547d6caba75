//! RSAES-OAEP (SHA-1, MGF1-SHA-1) content key transport

use crate::error::{KeyError, Result};
use crate::pem::{rsa_private_key, rsa_public_key};
use rsa::Oaep;
use rsa::rand_core::OsRng;
use sha1::Sha1;

/// Encrypt `cek` to the RSA public key in `pem`
///
/// `pem` may be an SPKI or PKCS#1 public key, a certificate, or a private key.
///
/// # Errors
///
/// Fails when the key does not decode or the CEK is too long for the modulus.
pub fn encrypt_key(pem: &str, cek: &[u8]) -> Result<Vec<u8>> {
    let public = rsa_public_key(pem)?;
    public
        .encrypt(&mut OsRng, Oaep::new::<Sha1>(), cek)
        .map_err(|e| KeyError::EncryptionFailed(e.to_string()))
}

/// Recover a CEK with the RSA private key in `pem`
///
/// # Errors
///
/// Fails when `pem` is not an RSA private key or the padding check fails.
pub fn decrypt_key(pem: &str, encrypted: &[u8]) -> Result<Vec<u8>> {
    let private = rsa_private_key(pem)?;
    private
        .decrypt(Oaep::new::<Sha1>(), encrypted)
        .map_err(|e| KeyError::DecryptionFailed(e.to_string()))
}
