//! Parsed tokens and their verification
//!
//! ```text
//! parse ──▶ ParseError ─────────────────────────┐
//!   │                                            ▼
//!   └────▶ Parsed ──verify──▶ VerifyError | Expired | Valid
//! ```
//!
//! Parsing never fails: a malformed token carries its error and verifying it
//! yields that error.

use crate::claims::{AllowList, Outcome, Policy, validate};
use crate::config::JoseConfig;
use crate::error::{JwtError, JwtResult, TokenError};
use crate::futures::TokenVerificationFuture;
use crate::jwe::{self, KeySource, Mode};
use crate::jws;
use joset_common::{LoggingTransformer, base64url};
use joset_key::{KeyMaterial, KeyRef};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// Compact serialization kind, decided by the segment count alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Three segments
    Jws,
    /// Five segments
    Jwe,
}

/// Base64url JSON encoding of a header or claim set
pub(crate) fn encode_segment(map: &Map<String, Value>) -> JwtResult<String> {
    let json = serde_json::to_vec(map).map_err(JwtError::from)?;
    Ok(base64url::encode(json))
}

/// Parse `bytes` as a JSON object, describing the failure
pub(crate) fn json_object(bytes: &[u8]) -> Result<Map<String, Value>, String> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Decode one base64url segment holding a JSON object
pub(crate) fn decode_segment(segment: &str) -> Result<Map<String, Value>, String> {
    let bytes = base64url::decode(segment).map_err(|e| e.to_string())?;
    json_object(&bytes)
}

/// A token split into its segments, ready for policy setup and verification
#[derive(Debug, Clone)]
pub struct ParsedToken {
    parts: Vec<String>,
    token_type: Option<TokenType>,
    header: Option<Map<String, Value>>,
    payload: Option<Map<String, Value>>,
    error: Option<TokenError>,
    policy: Policy,
    config: Arc<JoseConfig>,
}

impl ParsedToken {
    pub(crate) fn parse(token: &str, config: Arc<JoseConfig>) -> Self {
        let parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut parsed = Self {
            token_type: match parts.len() {
                3 => Some(TokenType::Jws),
                5 => Some(TokenType::Jwe),
                _ => None,
            },
            parts,
            header: None,
            payload: None,
            error: None,
            policy: Policy::default(),
            config,
        };
        if parsed.token_type.is_none() {
            parsed.error = Some(TokenError::InvalidToken);
            return parsed;
        }

        match decode_segment(&parsed.parts[0]) {
            Ok(header) => parsed.header = Some(header),
            Err(detail) => {
                parsed.error = Some(TokenError::NonParsableHeader(detail));
                return parsed;
            }
        }
        // JWE claims stay opaque until decryption
        if parsed.token_type == Some(TokenType::Jws) {
            match decode_segment(&parsed.parts[1]) {
                Ok(payload) => parsed.payload = Some(payload),
                Err(detail) => parsed.error = Some(TokenError::NonParsablePayload(detail)),
            }
        }
        parsed
    }

    /// Accepted `alg` values
    #[must_use]
    pub fn set_algorithm_list(mut self, algorithms: impl Into<AllowList>) -> Self {
        self.policy.algorithms = Some(algorithms.into());
        self
    }

    /// Accepted `alg` and `enc` values
    #[must_use]
    pub fn set_algorithm_lists(
        self,
        algorithms: impl Into<AllowList>,
        encryptions: impl Into<AllowList>,
    ) -> Self {
        self.set_algorithm_list(algorithms)
            .set_encryption_list(encryptions)
    }

    /// Accepted `enc` values
    #[must_use]
    pub fn set_encryption_list(mut self, encryptions: impl Into<AllowList>) -> Self {
        self.policy.encryptions = Some(encryptions.into());
        self
    }

    /// Accepted `aud` values
    #[must_use]
    pub fn set_audience(mut self, audience: impl Into<AllowList>) -> Self {
        self.policy.audience = Some(audience.into());
        self
    }

    /// Accepted `iss` values
    #[must_use]
    pub fn set_issuer(mut self, issuer: impl Into<AllowList>) -> Self {
        self.policy.issuer = Some(issuer.into());
        self
    }

    /// Maximum age in seconds from `iat`; ignored unless positive
    #[must_use]
    pub fn set_token_lifetime(mut self, seconds: i64) -> Self {
        self.policy = self.policy.with_lifetime(seconds);
        self
    }

    /// Replace the whole policy
    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Raw segments
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// `None` when the segment count is neither 3 nor 5
    #[must_use]
    pub fn token_type(&self) -> Option<TokenType> {
        self.token_type
    }

    /// Decoded header
    #[must_use]
    pub fn header(&self) -> Option<&Map<String, Value>> {
        self.header.as_ref()
    }

    /// Decoded claims; JWS only, before verification
    #[must_use]
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.payload.as_ref()
    }

    /// Parse error, if any
    #[must_use]
    pub fn error(&self) -> Option<&TokenError> {
        self.error.as_ref()
    }

    /// Policy applied by `verify`
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Pick the key: a keystore needs a `kid` header naming a non-empty entry
    fn select_key<'k>(&self, key: &'k KeyRef) -> Result<&'k KeyMaterial, TokenError> {
        match key {
            KeyRef::Direct(material) => Ok(material),
            KeyRef::Keystore(_) => {
                let kid = self
                    .header
                    .as_ref()
                    .and_then(|h| h.get("kid"))
                    .and_then(Value::as_str)
                    .ok_or(TokenError::MissingKid)?;
                key.lookup(kid).ok_or_else(|| TokenError::KeyNotFound {
                    kid: kid.to_string(),
                })
            }
        }
    }

    /// Parse error and key selection, shared by both verification paths
    fn prepare<'k>(
        &self,
        key: &'k KeyRef,
    ) -> Result<(&'k KeyMaterial, &Map<String, Value>), TokenError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let header = self.header.as_ref().ok_or(TokenError::InvalidToken)?;
        Ok((self.select_key(key)?, header))
    }

    fn finish(self, result: Result<Map<String, Value>, TokenError>) -> VerifiedToken {
        let (outcome, payload) = match result {
            Ok(payload) => {
                let outcome = validate(&payload, &self.policy, self.config.clock.now_millis());
                (outcome, Some(payload))
            }
            Err(error) => (Outcome::Error(error), self.payload),
        };
        match &outcome {
            Outcome::Valid => debug!(token_type = ?self.token_type, "token valid"),
            Outcome::Expired(exp) => debug!(token_type = ?self.token_type, exp, "token expired"),
            Outcome::Error(e) => debug!(token_type = ?self.token_type, error = %e, "token rejected"),
        }
        VerifiedToken {
            outcome,
            token_type: self.token_type,
            header: self.header,
            payload,
        }
    }

    /// Verify on the caller's thread
    ///
    /// PBES2 tokens with a `p2c` above the synchronous ceiling are rejected;
    /// use [`ParsedToken::verify_async`] for them.
    #[must_use]
    pub fn verify(self, key: &KeyRef) -> VerifiedToken {
        let result = self.prepare(key).and_then(|(material, header)| {
            match self.token_type {
                Some(TokenType::Jws) => {
                    jws::verify(&self.parts, header, &self.policy, material)?;
                    self.payload.clone().ok_or(TokenError::InvalidToken)
                }
                Some(TokenType::Jwe) => {
                    jwe::verify(&self.parts, header, &self.policy, &self.config.pbes2, material)
                }
                None => Err(TokenError::InvalidToken),
            }
        });
        self.finish(result)
    }

    async fn verify_in_task(self, key: KeyRef) -> JwtResult<VerifiedToken> {
        let (material, header) = match self.prepare(&key) {
            Ok(selected) => selected,
            Err(error) => return Ok(self.finish(Err(error))),
        };
        if self.token_type != Some(TokenType::Jwe) {
            return Ok(self.verify(&key));
        }

        let planned = jwe::plan_decryption(header, &self.policy, &self.config.pbes2, Mode::Async);
        let mut plan = match planned {
            Ok(plan) => plan,
            Err(error) => return Ok(self.finish(Err(error))),
        };
        let source = match plan.derivation.take() {
            Some(derivation) => {
                let password = zeroize::Zeroizing::new(material.password_bytes().to_vec());
                let derived = tokio::task::spawn_blocking(move || derivation.run(&password))
                    .await
                    .map_err(|e| {
                        LoggingTransformer::log_crypto_error("PBES2 derivation task", &e);
                        JwtError::TaskJoinError
                    })?;
                match jwe::derived_or_failed(derived) {
                    Ok(kek) => KeySource::Derived(kek),
                    Err(error) => return Ok(self.finish(Err(error))),
                }
            }
            None => KeySource::Material(material),
        };
        let result = jwe::decrypt(&self.parts, &plan, &source);
        Ok(self.finish(result))
    }

    /// Verify on a spawned tokio task, with PBKDF2 on the blocking pool
    ///
    /// Accepts `p2c` up to the asynchronous ceiling. Must be called within a
    /// tokio runtime.
    pub fn verify_async(self, key: KeyRef) -> TokenVerificationFuture {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let verified = self.verify_in_task(key).await;
            let _ = tx.send(verified);
        });
        TokenVerificationFuture::new(rx)
    }
}

/// Result of verifying a [`ParsedToken`]
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    outcome: Outcome,
    token_type: Option<TokenType>,
    header: Option<Map<String, Value>>,
    payload: Option<Map<String, Value>>,
}

impl VerifiedToken {
    /// Final state
    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// `true` when every check passed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }

    /// Expiration time in unix seconds for an expired token
    #[must_use]
    pub fn expired(&self) -> Option<i64> {
        match self.outcome {
            Outcome::Expired(exp) => Some(exp),
            _ => None,
        }
    }

    /// Failure, if verification failed
    #[must_use]
    pub fn error(&self) -> Option<&TokenError> {
        match &self.outcome {
            Outcome::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Compact serialization kind
    #[must_use]
    pub fn token_type(&self) -> Option<TokenType> {
        self.token_type
    }

    /// Decoded header
    #[must_use]
    pub fn header(&self) -> Option<&Map<String, Value>> {
        self.header.as_ref()
    }

    /// Claims: always for a parsable JWS, for JWE only once decrypted
    #[must_use]
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.payload.as_ref()
    }

    /// Take the claims
    #[must_use]
    pub fn into_payload(self) -> Option<Map<String, Value>> {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(token: &str) -> ParsedToken {
        ParsedToken::parse(token, Arc::new(JoseConfig::default()))
    }

    #[test]
    fn segment_count_decides_the_type() {
        let header = base64url::encode(br#"{"alg":"HS256"}"#);
        let payload = base64url::encode(br#"{"iat":1}"#);
        assert_eq!(parse(&format!("{header}.{payload}.sig")).token_type(), Some(TokenType::Jws));
        assert_eq!(parse(&format!("{header}..iv.ct.tag")).token_type(), Some(TokenType::Jwe));
        for bad in ["", "a", "a.b", "a.b.c.d", "a.b.c.d.e.f"] {
            let parsed = parse(bad);
            assert_eq!(parsed.token_type(), None);
            assert_eq!(parsed.error(), Some(&TokenError::InvalidToken));
        }
    }

    #[test]
    fn header_must_be_a_json_object() {
        let parsed = parse("bm90IGpzb24.e30.sig");
        assert!(matches!(parsed.error(), Some(TokenError::NonParsableHeader(_))));
        let parsed = parse(&format!("{}.e30.sig", base64url::encode("[1]")));
        assert_eq!(
            parsed.error(),
            Some(&TokenError::NonParsableHeader("expected a JSON object".into()))
        );
        assert!(parsed
            .error()
            .map(|e| e.to_string().starts_with("Non parsable header. "))
            .unwrap_or(false));
    }

    #[test]
    fn jws_payload_is_parsed_eagerly() {
        let header = base64url::encode(br#"{"alg":"HS256"}"#);
        let parsed = parse(&format!("{header}.e30.sig"));
        assert_eq!(parsed.payload(), Some(&Map::new()));
        let parsed = parse(&format!("{header}.bm9wZQ.sig"));
        assert!(matches!(parsed.error(), Some(TokenError::NonParsablePayload(_))));
        // a JWE payload is not looked at before decryption
        let parsed = parse(&format!("{header}.a.b.bm9wZQ.c"));
        assert_eq!(parsed.error(), None);
        assert_eq!(parsed.payload(), None);
    }

    #[test]
    fn parse_error_short_circuits_verification() {
        let verified = parse("a.b").verify(&KeyRef::from("c2VjcmV0"));
        assert_eq!(verified.error(), Some(&TokenError::InvalidToken));
        assert!(!verified.is_valid());
    }

    #[test]
    fn keystore_needs_a_kid() {
        let header = base64url::encode(br#"{"alg":"HS256"}"#);
        let store = KeyRef::keystore([("k1", vec![1u8; 32])]);
        let verified = parse(&format!("{header}.e30.sig")).verify(&store);
        assert_eq!(verified.error(), Some(&TokenError::MissingKid));

        let header = base64url::encode(br#"{"alg":"HS256","kid":"k2"}"#);
        let verified = parse(&format!("{header}.e30.sig")).verify(&store);
        let error = verified.error().unwrap();
        assert_eq!(error.to_string(), "Key with id not found");
        assert_eq!(error.kid(), Some("k2"));
    }

    #[test]
    fn setters_build_the_policy() {
        let parsed = parse("a.b.c")
            .set_algorithm_lists(["HS256"], "A128GCM")
            .set_audience("api")
            .set_issuer(vec!["me", "you"])
            .set_token_lifetime(60)
            .set_token_lifetime(-1);
        let policy = parsed.policy();
        assert!(policy.allows_algorithm("HS256"));
        assert!(!policy.allows_encryption("A256GCM"));
        assert_eq!(policy.lifetime, Some(60));
        assert!(policy.issuer.as_ref().unwrap().contains("you"));

        let parsed = parsed.with_policy(Policy::new());
        assert_eq!(parsed.policy(), &Policy::new());
    }
}
