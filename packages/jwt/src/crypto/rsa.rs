//! RSASSA-PKCS1-v1_5 signatures (RS256, RS384, RS512)

use crate::algorithms::JwsAlgorithm;
use crate::error::{JwtError, JwtResult};
use joset_key::pem;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::sha2::{Sha256, Sha384, Sha512};
use rsa::signature::{SignatureEncoding, Signer, Verifier};

/// Sign with a PKCS#1 or PKCS#8 RSA private key in PEM
pub(crate) fn sign(alg: JwsAlgorithm, message: &[u8], private_pem: &str) -> JwtResult<Vec<u8>> {
    let private = pem::rsa_private_key(private_pem)?;
    let signature = match alg.bits() {
        256 => SigningKey::<Sha256>::new(private).try_sign(message),
        384 => SigningKey::<Sha384>::new(private).try_sign(message),
        _ => SigningKey::<Sha512>::new(private).try_sign(message),
    }
    .map_err(|e| JwtError::Crypto(format!("RSA signing failed: {e}")))?;
    Ok(signature.to_vec())
}

/// Verify against a public key, certificate or private key in PEM
pub(crate) fn verify(
    alg: JwsAlgorithm,
    message: &[u8],
    signature: &[u8],
    public_pem: &str,
) -> JwtResult<bool> {
    let public = pem::rsa_public_key(public_pem)?;
    let signature = Signature::try_from(signature)
        .map_err(|e| JwtError::Crypto(format!("RSA signature encoding: {e}")))?;
    let verified = match alg.bits() {
        256 => VerifyingKey::<Sha256>::new(public).verify(message, &signature),
        384 => VerifyingKey::<Sha384>::new(public).verify(message, &signature),
        _ => VerifyingKey::<Sha512>::new(public).verify(message, &signature),
    };
    Ok(verified.is_ok())
}
