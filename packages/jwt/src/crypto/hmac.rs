//! HMAC-SHA signatures (HS256, HS384, HS512)

use crate::algorithms::JwsAlgorithm;
use crate::error::{JwtError, JwtResult};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

macro_rules! hmac_sign {
    ($name:ident, $digest:ty) => {
        #[inline]
        fn $name(message: &[u8], secret: &[u8]) -> JwtResult<Vec<u8>> {
            let mut mac = <Hmac<$digest> as Mac>::new_from_slice(secret)
                .map_err(|_| JwtError::invalid_key("Invalid HMAC key"))?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
    };
}

hmac_sign!(sign_hs256, Sha256);
hmac_sign!(sign_hs384, Sha384);
hmac_sign!(sign_hs512, Sha512);

fn check_key_len(alg: JwsAlgorithm, secret: &[u8]) -> JwtResult<()> {
    let min = alg.min_hmac_key_len();
    if secret.len() < min {
        return Err(JwtError::InvalidKey(format!(
            "Key length must be at least {min} bytes"
        )));
    }
    Ok(())
}

/// MAC `message` with `secret`, which must be at least `bits / 8` bytes
pub(crate) fn sign(alg: JwsAlgorithm, message: &[u8], secret: &[u8]) -> JwtResult<Vec<u8>> {
    check_key_len(alg, secret)?;
    match alg.bits() {
        256 => sign_hs256(message, secret),
        384 => sign_hs384(message, secret),
        _ => sign_hs512(message, secret),
    }
}

/// Recompute the MAC and compare in constant time
pub(crate) fn verify(
    alg: JwsAlgorithm,
    message: &[u8],
    signature: &[u8],
    secret: &[u8],
) -> JwtResult<bool> {
    let expected = sign(alg, message, secret)?;
    Ok(bool::from(expected.ct_eq(signature)))
}
