//! JWS compact serialization (RFC 7515)
//!
//! `BASE64URL(header) "." BASE64URL(claims) "." BASE64URL(signature)`, the
//! signature covering the first two segments as ASCII.

use crate::algorithms::JwsAlgorithm;
use crate::claims::Policy;
use crate::crypto;
use crate::error::{JwtError, JwtResult, TokenError};
use crate::token::encode_segment;
use joset_common::base64url;
use joset_key::KeyMaterial;
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Sign `claims` into a compact JWS
///
/// The header is `{"alg": .., "kid": ..}` in that order, `kid` only when
/// given.
pub(crate) fn generate(
    alg: &str,
    claims: &Map<String, Value>,
    key: &KeyMaterial,
    kid: Option<&str>,
) -> JwtResult<String> {
    let alg: JwsAlgorithm = alg.parse()?;

    let mut header = Map::new();
    header.insert("alg".into(), Value::from(alg.name()));
    if let Some(kid) = kid {
        header.insert("kid".into(), Value::from(kid));
    }

    let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(claims)?);
    let signature = crypto::sign(alg, signing_input.as_bytes(), key)?;
    debug!(alg = alg.name(), kid = ?kid, "generated JWS");
    Ok(format!("{signing_input}.{}", base64url::encode(signature)))
}

/// Check the header against `policy` and verify the signature
///
/// Every failure after the algorithm checks becomes
/// [`TokenError::IntegrityCheckFailed`]; the cause is only traced.
pub(crate) fn verify(
    parts: &[String],
    header: &Map<String, Value>,
    policy: &Policy,
    key: &KeyMaterial,
) -> Result<(), TokenError> {
    let name = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or(TokenError::MissingAlg)?;
    let alg: JwsAlgorithm = name
        .parse()
        .map_err(|_| TokenError::UnrecognizedAlgorithm(name.to_string()))?;
    if !policy.allows_algorithm(name) {
        return Err(TokenError::UnwantedAlgorithm(name.to_string()));
    }

    let [protected, payload, signature] = parts else {
        return Err(TokenError::InvalidToken);
    };
    let signing_input = format!("{protected}.{payload}");
    let verified = base64url::decode(signature)
        .map_err(JwtError::from)
        .and_then(|signature| crypto::verify(alg, signing_input.as_bytes(), &signature, key));

    match verified {
        Ok(true) => Ok(()),
        Ok(false) => {
            trace!(alg = name, "JWS signature mismatch");
            Err(TokenError::IntegrityCheckFailed)
        }
        Err(e) => {
            trace!(alg = name, error = %e, key = %key.fingerprint(), "JWS verification failed");
            Err(TokenError::IntegrityCheckFailed)
        }
    }
}
