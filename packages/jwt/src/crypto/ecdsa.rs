//! ECDSA signatures (ES256 on P-256, ES384 on P-384, ES512 on P-521)
//!
//! Signing is deterministic (RFC 6979). The curve's DER output is converted
//! to the fixed-width JWS form and back with [`super::ecdsa_der`].

use super::ecdsa_der::{concat_to_der, der_to_concat};
use crate::algorithms::JwsAlgorithm;
use crate::error::{JwtError, JwtResult};
use joset_key::pem;

macro_rules! ecdsa_curve {
    ($sign:ident, $verify:ident, $curve:ident, $signing_key:path, $verifying_key:path) => {
        fn $sign(message: &[u8], private_pem: &str, size: usize) -> JwtResult<Vec<u8>> {
            use ::$curve::ecdsa::signature::Signer;
            let key = $signing_key(private_pem)?;
            let signature: ::$curve::ecdsa::Signature = key
                .try_sign(message)
                .map_err(|e| JwtError::Crypto(format!("ECDSA signing failed: {e}")))?;
            der_to_concat(signature.to_der().as_bytes(), size)
                .map_err(|e| JwtError::Crypto(e.to_string()))
        }

        fn $verify(message: &[u8], der: &[u8], public_pem: &str) -> JwtResult<bool> {
            use ::$curve::ecdsa::signature::Verifier;
            let key = $verifying_key(public_pem)?;
            let signature = ::$curve::ecdsa::Signature::from_der(der)
                .map_err(|e| JwtError::Crypto(format!("ECDSA signature encoding: {e}")))?;
            Ok(key.verify(message, &signature).is_ok())
        }
    };
}

ecdsa_curve!(sign_p256, verify_p256, p256, pem::p256_signing_key, pem::p256_verifying_key);
ecdsa_curve!(sign_p384, verify_p384, p384, pem::p384_signing_key, pem::p384_verifying_key);
ecdsa_curve!(sign_p521, verify_p521, p521, pem::p521_signing_key, pem::p521_verifying_key);

/// Sign and return `r ‖ s`
pub(crate) fn sign(alg: JwsAlgorithm, message: &[u8], private_pem: &str) -> JwtResult<Vec<u8>> {
    let size = alg.ecdsa_component_size();
    match alg.bits() {
        256 => sign_p256(message, private_pem, size),
        384 => sign_p384(message, private_pem, size),
        _ => sign_p521(message, private_pem, size),
    }
}

/// Verify an `r ‖ s` signature
///
/// A signature that is not exactly twice the component size fails without
/// touching the key.
pub(crate) fn verify(
    alg: JwsAlgorithm,
    message: &[u8],
    signature: &[u8],
    public_pem: &str,
) -> JwtResult<bool> {
    let size = alg.ecdsa_component_size();
    if signature.len() != 2 * size {
        return Ok(false);
    }
    let der = concat_to_der(signature, size).map_err(|e| JwtError::Crypto(e.to_string()))?;
    match alg.bits() {
        256 => verify_p256(message, &der, public_pem),
        384 => verify_p384(message, &der, public_pem),
        _ => verify_p521(message, &der, public_pem),
    }
}
