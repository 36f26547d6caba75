//! Token generation and parsing entry points
//!
//! [`Jose`] carries a [`JoseConfig`]; the free functions use the default
//! configuration.

use crate::config::{Clock, JoseConfig};
use crate::error::{JwtError, JwtResult};
use crate::futures::TokenGenerationFuture;
use crate::jwe::{self, KeySource};
use crate::jws;
use crate::token::ParsedToken;
use joset_common::LoggingTransformer;
use joset_key::KeyRef;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::oneshot;
use zeroize::Zeroizing;

/// Serialize `payload` and stamp `iat`
fn claims_of<T: Serialize + ?Sized>(payload: &T, clock: &Clock) -> JwtResult<Map<String, Value>> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(mut claims)) => {
            claims.insert("iat".into(), Value::from(clock.now_secs()));
            Ok(claims)
        }
        _ => Err(JwtError::InvalidPayload),
    }
}

/// Configured token engine
///
/// ```no_run
/// use joset_jwt::{Jose, JoseConfig, KeyRef};
/// use serde_json::json;
///
/// let jose = Jose::new(JoseConfig::default());
/// let key = KeyRef::from(vec![7u8; 32]);
/// let token = jose.generate_jws("HS256", &json!({ "sub": "alice" }), &key, None)?;
/// let verified = jose.parse(&token).set_algorithm_list("HS256").verify(&key);
/// assert!(verified.is_valid());
/// # Ok::<(), joset_jwt::JwtError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Jose {
    config: Arc<JoseConfig>,
}

impl Jose {
    /// Engine with `config`
    #[must_use]
    pub fn new(config: JoseConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &JoseConfig {
        &self.config
    }

    /// Sign `payload` into a compact JWS
    ///
    /// With a keystore, `kid` selects the key; it is written to the header
    /// whenever given.
    ///
    /// # Errors
    ///
    /// In order: `InvalidPayload` when `payload` is not a JSON object,
    /// `InvalidKeyId` for a keystore without a matching entry,
    /// `UnrecognizedAlgorithm`, then key and signing failures.
    pub fn generate_jws<T: Serialize + ?Sized>(
        &self,
        alg: &str,
        payload: &T,
        key: &KeyRef,
        kid: Option<&str>,
    ) -> JwtResult<String> {
        let claims = claims_of(payload, &self.config.clock)?;
        let material = key.resolve(kid)?;
        jws::generate(alg, &claims, material, kid)
    }

    /// Encrypt `payload` into a compact JWE
    ///
    /// PBES2 derivation runs on the caller's thread.
    ///
    /// # Errors
    ///
    /// In order: `InvalidPayload`, `InvalidKeyId`,
    /// `UnrecognizedKeyManagement`, `UnrecognizedContentEncryption`, then
    /// key and encryption failures.
    pub fn generate_jwe<T: Serialize + ?Sized>(
        &self,
        alg: &str,
        enc: &str,
        payload: &T,
        key: &KeyRef,
        kid: Option<&str>,
    ) -> JwtResult<String> {
        let claims = claims_of(payload, &self.config.clock)?;
        let material = key.resolve(kid)?;
        jwe::generate(alg, enc, &claims, material, kid, &self.config)
    }

    /// [`Jose::generate_jwe`] on a spawned tokio task, with PBKDF2 on the
    /// blocking pool
    ///
    /// Must be called within a tokio runtime. Errors arrive through the
    /// future's output.
    pub fn generate_jwe_async<T: Serialize + ?Sized>(
        &self,
        alg: &str,
        enc: &str,
        payload: &T,
        key: &KeyRef,
        kid: Option<&str>,
    ) -> TokenGenerationFuture {
        let (tx, rx) = oneshot::channel();
        let prepared = claims_of(payload, &self.config.clock).and_then(|claims| {
            let material = key.resolve(kid)?.clone();
            Ok((claims, material))
        });
        let config = Arc::clone(&self.config);
        let alg = alg.to_string();
        let enc = enc.to_string();
        let kid = kid.map(str::to_string);

        tokio::spawn(async move {
            let result = match prepared {
                Ok((claims, material)) => {
                    generate_jwe_in_task(&alg, &enc, &claims, &material, kid.as_deref(), &config)
                        .await
                }
                Err(e) => Err(e),
            };
            let _ = tx.send(result);
        });

        TokenGenerationFuture::new(rx)
    }

    /// Parse a compact token with this engine's configuration
    #[must_use]
    pub fn parse(&self, token: &str) -> ParsedToken {
        ParsedToken::parse(token, Arc::clone(&self.config))
    }
}

async fn generate_jwe_in_task(
    alg: &str,
    enc: &str,
    claims: &Map<String, Value>,
    material: &joset_key::KeyMaterial,
    kid: Option<&str>,
    config: &JoseConfig,
) -> JwtResult<String> {
    let mut plan = jwe::plan_generation(alg, enc, kid, &config.pbes2)?;
    let source = match plan.derivation.take() {
        Some(derivation) => {
            let password = Zeroizing::new(material.password_bytes().to_vec());
            let kek = tokio::task::spawn_blocking(move || derivation.run(&password))
                .await
                .map_err(|e| {
                    LoggingTransformer::log_crypto_error("PBES2 derivation task", &e);
                    JwtError::TaskJoinError
                })??;
            KeySource::Derived(kek)
        }
        None => KeySource::Material(material),
    };
    jwe::seal(&plan, &source, claims)
}

/// Sign with the default configuration, see [`Jose::generate_jws`]
///
/// # Errors
///
/// As [`Jose::generate_jws`].
pub fn generate_jws<T: Serialize + ?Sized>(
    alg: &str,
    payload: &T,
    key: &KeyRef,
    kid: Option<&str>,
) -> JwtResult<String> {
    Jose::default().generate_jws(alg, payload, key, kid)
}

/// Encrypt with the default configuration, see [`Jose::generate_jwe`]
///
/// # Errors
///
/// As [`Jose::generate_jwe`].
pub fn generate_jwe<T: Serialize + ?Sized>(
    alg: &str,
    enc: &str,
    payload: &T,
    key: &KeyRef,
    kid: Option<&str>,
) -> JwtResult<String> {
    Jose::default().generate_jwe(alg, enc, payload, key, kid)
}

/// Encrypt asynchronously with the default configuration, see
/// [`Jose::generate_jwe_async`]
pub fn generate_jwe_async<T: Serialize + ?Sized>(
    alg: &str,
    enc: &str,
    payload: &T,
    key: &KeyRef,
    kid: Option<&str>,
) -> TokenGenerationFuture {
    Jose::default().generate_jwe_async(alg, enc, payload, key, kid)
}

/// Parse with the default configuration
#[must_use]
pub fn parse(token: &str) -> ParsedToken {
    Jose::default().parse(token)
}
