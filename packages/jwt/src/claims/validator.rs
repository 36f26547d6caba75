//! Claim checks run after signature verification or decryption
//!
//! Order: `aud`, `iss`, `iat`, then expiration. The first failing check
//! decides the outcome.

use super::{AllowList, Policy};
use crate::error::TokenError;
use serde_json::{Map, Value};

/// Final state of a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// All checks passed
    Valid,
    /// Signature or decryption succeeded but the token expired at the given
    /// unix time in seconds
    Expired(i64),
    /// Verification failed
    Error(TokenError),
}

impl Outcome {
    /// `true` for [`Outcome::Valid`]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Outcome::Valid)
    }
}

/// Numeric claim value: a JSON number or a numeric string
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// [`number`] truncated to whole seconds, exact for integers
fn coerce(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up, so the upper bound is exclusive
    (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f.trunc() as i64)
}

fn check_listed(
    payload: &Map<String, Value>,
    claim: &str,
    list: &AllowList,
    missing: TokenError,
    mismatching: TokenError,
) -> Result<(), TokenError> {
    match payload.get(claim) {
        None => Err(missing),
        Some(Value::String(s)) if list.contains(s) => Ok(()),
        Some(_) => Err(mismatching),
    }
}

/// Apply the claim part of `policy` to `payload` at `now_millis`
#[must_use]
pub fn validate(payload: &Map<String, Value>, policy: &Policy, now_millis: i64) -> Outcome {
    if let Some(audience) = &policy.audience {
        if let Err(e) = check_listed(
            payload,
            "aud",
            audience,
            TokenError::MissingAudience,
            TokenError::MismatchingAudience,
        ) {
            return Outcome::Error(e);
        }
    }
    if let Some(issuer) = &policy.issuer {
        if let Err(e) = check_listed(
            payload,
            "iss",
            issuer,
            TokenError::MissingIssuer,
            TokenError::MismatchingIssuer,
        ) {
            return Outcome::Error(e);
        }
    }

    // positivity is judged before truncation
    let iat = match (number(payload.get("iat")), coerce(payload.get("iat"))) {
        (Some(raw), Some(iat)) if raw > 0.0 => iat,
        _ => return Outcome::Error(TokenError::InvalidIat),
    };

    let mut expiration = coerce(payload.get("exp")).filter(|&exp| exp != 0);
    if let Some(lifetime) = policy.lifetime {
        let bound = iat.saturating_add(lifetime);
        if expiration.is_none_or(|exp| bound < exp) {
            expiration = Some(bound);
        }
    }

    match expiration {
        Some(exp) if now_millis > exp.saturating_mul(1000) => Outcome::Expired(exp),
        _ => Outcome::Valid,
    }
}
