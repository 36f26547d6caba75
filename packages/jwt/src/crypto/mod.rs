//! JWS signature primitives and the ECDSA signature codec

mod ecdsa;
pub mod ecdsa_der;
mod hmac;
mod rsa;

use crate::algorithms::{JwsAlgorithm, SignatureFamily};
use crate::error::JwtResult;
use joset_key::KeyMaterial;

/// Sign `message` with the key shape `alg` expects
pub(crate) fn sign(alg: JwsAlgorithm, message: &[u8], key: &KeyMaterial) -> JwtResult<Vec<u8>> {
    match alg.family() {
        SignatureFamily::Hmac => hmac::sign(alg, message, &key.symmetric_bytes()?),
        SignatureFamily::Rsa => rsa::sign(alg, message, key.pem_text()?),
        SignatureFamily::Ecdsa => ecdsa::sign(alg, message, key.pem_text()?),
    }
}

/// Check `signature` over `message`
///
/// `Ok(false)` is a well-formed mismatch; `Err` is a key or encoding problem.
pub(crate) fn verify(
    alg: JwsAlgorithm,
    message: &[u8],
    signature: &[u8],
    key: &KeyMaterial,
) -> JwtResult<bool> {
    match alg.family() {
        SignatureFamily::Hmac => hmac::verify(alg, message, signature, &key.symmetric_bytes()?),
        SignatureFamily::Rsa => rsa::verify(alg, message, signature, key.pem_text()?),
        SignatureFamily::Ecdsa => ecdsa::verify(alg, message, signature, key.pem_text()?),
    }
}
