//! JWE compact serialization (RFC 7516)
//!
//! `BASE64URL(header) "." BASE64URL(encrypted key) "." BASE64URL(iv) "."
//! BASE64URL(ciphertext) "." BASE64URL(tag)`, with the first segment as ASCII
//! bytes for the AAD.
//!
//! Both directions are split in two phases so the synchronous and the
//! asynchronous paths share everything except the PBKDF2 step: a plan is
//! built from the algorithm names (and, when verifying, the header), the
//! optional [`Derivation`] runs wherever the caller wants it to, and the
//! plan is then sealed or opened with the resulting [`KeySource`].

use crate::algorithms::{ContentEncryption, KeyManagement, parse_content_encryption};
use crate::claims::Policy;
use crate::config::{JoseConfig, Pbes2Config};
use crate::error::{JwtError, JwtResult, TokenError};
use crate::token::{encode_segment, json_object};
use joset_cipher::key_wrap;
use joset_common::base64url;
use joset_key::derive::{self, Pbkdf2Hash, Pbkdf2Params};
use joset_key::{KeyMaterial, rsa_oaep};
use rand::RngCore;
use serde_json::{Map, Value};
use tracing::{debug, trace};
use zeroize::Zeroizing;

/// Which `p2c` ceiling applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Derivation on the caller's thread
    Sync,
    /// Derivation on the blocking pool
    Async,
}

/// A pending PBES2 key derivation
#[derive(Debug, Clone)]
pub(crate) struct Derivation {
    salt: Vec<u8>,
    params: Pbkdf2Params,
}

impl Derivation {
    fn new(hash: Pbkdf2Hash, kw_bits: usize, salt: Vec<u8>, iterations: u32) -> Self {
        Self {
            salt,
            params: Pbkdf2Params {
                hash,
                iterations,
                output_size: kw_bits / 8,
            },
        }
    }

    /// Stretch `password` into the key wrap KEK
    pub(crate) fn run(&self, password: &[u8]) -> JwtResult<Zeroizing<Vec<u8>>> {
        Ok(derive::pbkdf2(password, &self.salt, &self.params)?)
    }
}

/// Key management input after any password derivation
pub(crate) enum KeySource<'a> {
    /// Caller-supplied key material
    Material(&'a KeyMaterial),
    /// PBES2-derived key wrap KEK
    Derived(Zeroizing<Vec<u8>>),
}

impl KeySource<'_> {
    fn symmetric(&self) -> JwtResult<Zeroizing<Vec<u8>>> {
        match self {
            KeySource::Material(material) => Ok(material.symmetric_bytes()?),
            KeySource::Derived(kek) => Ok(kek.clone()),
        }
    }

    fn pem(&self) -> JwtResult<&str> {
        match self {
            KeySource::Material(material) => Ok(material.pem_text()?),
            KeySource::Derived(_) => Err(JwtError::invalid_key("derived key is not a PEM key")),
        }
    }
}

fn direct_cek(key: &KeySource<'_>, cek_len: usize) -> JwtResult<Zeroizing<Vec<u8>>> {
    let key = key.symmetric()?;
    match key.get(..cek_len) {
        Some(cek) => Ok(Zeroizing::new(cek.to_vec())),
        None => Err(JwtError::InvalidKey(format!(
            "Key must be at least {cek_len} bytes"
        ))),
    }
}

// ===== generation =====

/// Everything needed to seal a token except the key
#[derive(Debug)]
pub(crate) struct Generation {
    alg: KeyManagement,
    enc: ContentEncryption,
    protected: String,
    /// PBES2 derivation still to run
    pub(crate) derivation: Option<Derivation>,
}

/// Parse the algorithm names and build the protected header
///
/// For PBES2 a fresh salt `alg ‖ 0x00 ‖ random` goes into `p2s` and the
/// configured iteration count into `p2c`.
pub(crate) fn plan_generation(
    alg: &str,
    enc: &str,
    kid: Option<&str>,
    pbes2: &Pbes2Config,
) -> JwtResult<Generation> {
    let alg: KeyManagement = alg.parse()?;
    let enc = parse_content_encryption(enc)?;

    let mut header = Map::new();
    header.insert("alg".into(), Value::from(alg.name()));
    header.insert("enc".into(), Value::from(enc.name()));
    if let Some(kid) = kid {
        header.insert("kid".into(), Value::from(kid));
    }

    let derivation = match (alg.pbes2_hash(), alg.kw_bits()) {
        (Some(hash), Some(bits)) => {
            let mut salt = Vec::with_capacity(alg.name().len() + 1 + pbes2.salt_len);
            salt.extend_from_slice(alg.name().as_bytes());
            salt.push(0);
            let random_start = salt.len();
            salt.resize(random_start + pbes2.salt_len, 0);
            rand::rng().fill_bytes(&mut salt[random_start..]);

            header.insert("p2c".into(), Value::from(pbes2.iterations));
            header.insert("p2s".into(), Value::from(base64url::encode(&salt)));
            Some(Derivation::new(hash, bits, salt, pbes2.iterations))
        }
        _ => None,
    };

    Ok(Generation {
        alg,
        enc,
        protected: encode_segment(&header)?,
        derivation,
    })
}

/// Encrypt `claims` under a fresh (or direct) CEK
pub(crate) fn seal(
    plan: &Generation,
    key: &KeySource<'_>,
    claims: &Map<String, Value>,
) -> JwtResult<String> {
    let (cek, encrypted_key) = match (plan.alg, plan.alg.kw_bits()) {
        (KeyManagement::Dir, _) => (direct_cek(key, plan.enc.cek_len())?, Vec::new()),
        (_, Some(bits)) => {
            let cek = Zeroizing::new(plan.enc.generate_cek());
            let wrapped = key_wrap::wrap(&key.symmetric()?, &cek, bits)?;
            (cek, wrapped)
        }
        (_, None) => {
            let cek = Zeroizing::new(plan.enc.generate_cek());
            let encrypted = rsa_oaep::encrypt_key(key.pem()?, &cek)?;
            (cek, encrypted)
        }
    };

    let plaintext = Zeroizing::new(serde_json::to_vec(claims)?);
    let sealed = plan.enc.encrypt(&cek, plan.protected.as_bytes(), &plaintext)?;
    debug!(alg = plan.alg.name(), enc = plan.enc.name(), "generated JWE");
    Ok(format!(
        "{}.{}.{}.{}.{}",
        plan.protected,
        base64url::encode(encrypted_key),
        base64url::encode(&sealed.iv),
        base64url::encode(&sealed.ciphertext),
        base64url::encode(&sealed.tag),
    ))
}

/// Plan, derive on this thread and seal
pub(crate) fn generate(
    alg: &str,
    enc: &str,
    claims: &Map<String, Value>,
    key: &KeyMaterial,
    kid: Option<&str>,
    config: &JoseConfig,
) -> JwtResult<String> {
    let plan = plan_generation(alg, enc, kid, &config.pbes2)?;
    let source = match &plan.derivation {
        Some(derivation) => KeySource::Derived(derivation.run(key.password_bytes())?),
        None => KeySource::Material(key),
    };
    seal(&plan, &source, claims)
}

// ===== verification =====

/// Validated header of a token about to be decrypted
#[derive(Debug)]
pub(crate) struct Decryption {
    alg: KeyManagement,
    enc: ContentEncryption,
    /// PBES2 derivation still to run
    pub(crate) derivation: Option<Derivation>,
}

fn iteration_count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= u32::MAX as f64)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

/// Header checks, in order: `alg` and `enc` present, `alg` known and
/// allowed, `enc` known and allowed, then `p2c` / `p2s` for PBES2
pub(crate) fn plan_decryption(
    header: &Map<String, Value>,
    policy: &Policy,
    pbes2: &Pbes2Config,
    mode: Mode,
) -> Result<Decryption, TokenError> {
    let alg_name = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or(TokenError::MissingAlg)?;
    let enc_name = header
        .get("enc")
        .and_then(Value::as_str)
        .ok_or(TokenError::MissingEnc)?;

    let alg: KeyManagement = alg_name
        .parse()
        .map_err(|_| TokenError::UnrecognizedKeyManagement(alg_name.to_string()))?;
    if !policy.allows_algorithm(alg_name) {
        return Err(TokenError::UnwantedKeyManagement(alg_name.to_string()));
    }
    let enc = parse_content_encryption(enc_name)
        .map_err(|_| TokenError::UnrecognizedContentEncryption(enc_name.to_string()))?;
    if !policy.allows_encryption(enc_name) {
        return Err(TokenError::UnwantedContentEncryption(enc_name.to_string()));
    }

    let derivation = match (alg.pbes2_hash(), alg.kw_bits()) {
        (Some(hash), Some(bits)) => {
            let iterations = iteration_count(header.get("p2c"))
                .filter(|&c| c >= 1 && c <= u64::from(pbes2.max_async_iterations))
                .and_then(|c| u32::try_from(c).ok())
                .ok_or(TokenError::InvalidP2c)?;
            if mode == Mode::Sync && iterations > pbes2.max_sync_iterations {
                return Err(TokenError::P2cTooLargeForSync);
            }
            let salt = header
                .get("p2s")
                .and_then(Value::as_str)
                .and_then(|p2s| base64url::decode(p2s).ok())
                .ok_or(TokenError::InvalidP2s)?;
            Some(Derivation::new(hash, bits, salt, iterations))
        }
        _ => None,
    };

    Ok(Decryption {
        alg,
        enc,
        derivation,
    })
}

fn open(
    parts: &[String],
    plan: &Decryption,
    key: &KeySource<'_>,
) -> JwtResult<Zeroizing<Vec<u8>>> {
    let [protected, encrypted_key, iv, ciphertext, tag] = parts else {
        return Err(JwtError::serialization("JWE needs five segments"));
    };
    let encrypted_key = base64url::decode(encrypted_key)?;
    let iv = base64url::decode(iv)?;
    let ciphertext = base64url::decode(ciphertext)?;
    let tag = base64url::decode(tag)?;

    let cek = match (plan.alg, plan.alg.kw_bits()) {
        (KeyManagement::Dir, _) => direct_cek(key, plan.enc.cek_len())?,
        (_, Some(bits)) => Zeroizing::new(key_wrap::unwrap(&key.symmetric()?, &encrypted_key, bits)?),
        (_, None) => Zeroizing::new(rsa_oaep::decrypt_key(key.pem()?, &encrypted_key)?),
    };

    let plaintext = plan
        .enc
        .decrypt(&cek, &iv, protected.as_bytes(), &ciphertext, &tag)?;
    Ok(Zeroizing::new(plaintext))
}

/// Recover the CEK, decrypt and parse the claims
///
/// Every key recovery or decryption failure is
/// [`TokenError::DecryptionFailed`]; the cause is only traced.
pub(crate) fn decrypt(
    parts: &[String],
    plan: &Decryption,
    key: &KeySource<'_>,
) -> Result<Map<String, Value>, TokenError> {
    let plaintext = open(parts, plan, key).map_err(|e| {
        trace!(
            alg = plan.alg.name(),
            enc = plan.enc.name(),
            error = %e,
            "JWE decryption failed"
        );
        TokenError::DecryptionFailed
    })?;
    json_object(&plaintext).map_err(TokenError::NonParsablePayload)
}

/// Plan, derive on this thread and decrypt
pub(crate) fn verify(
    parts: &[String],
    header: &Map<String, Value>,
    policy: &Policy,
    pbes2: &Pbes2Config,
    key: &KeyMaterial,
) -> Result<Map<String, Value>, TokenError> {
    let plan = plan_decryption(header, policy, pbes2, Mode::Sync)?;
    let source = match &plan.derivation {
        Some(derivation) => KeySource::Derived(derived_or_failed(
            derivation.run(key.password_bytes()),
        )?),
        None => KeySource::Material(key),
    };
    decrypt(parts, &plan, &source)
}

/// Collapse a derivation failure like any other decryption failure
pub(crate) fn derived_or_failed(
    derived: JwtResult<Zeroizing<Vec<u8>>>,
) -> Result<Zeroizing<Vec<u8>>, TokenError> {
    derived.map_err(|e| {
        trace!(error = %e, "PBES2 derivation failed");
        TokenError::DecryptionFailed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims() -> Map<String, Value> {
        match json!({ "sub": "alice", "iat": 1_700_000_000 }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn split(token: &str) -> (Vec<String>, Map<String, Value>) {
        let parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let header = crate::token::decode_segment(&parts[0]).unwrap();
        (parts, header)
    }

    #[test]
    fn dir_round_trip_every_method() {
        let config = JoseConfig::default();
        let key = KeyMaterial::from(vec![3u8; 64]);
        for enc in ContentEncryption::ALL {
            let token = generate("dir", enc.name(), &claims(), &key, None, &config).unwrap();
            let (parts, header) = split(&token);
            assert_eq!(parts.len(), 5);
            assert!(parts[1].is_empty());
            let payload = verify(&parts, &header, &Policy::new(), &config.pbes2, &key).unwrap();
            assert_eq!(payload, claims());
        }
    }

    #[test]
    fn short_dir_key() {
        let config = JoseConfig::default();
        let short = KeyMaterial::from(vec![3u8; 31]);
        assert_eq!(
            generate("dir", "A256GCM", &claims(), &short, None, &config),
            Err(JwtError::InvalidKey("Key must be at least 32 bytes".into()))
        );

        let key = KeyMaterial::from(vec![3u8; 32]);
        let token = generate("dir", "A256GCM", &claims(), &key, None, &config).unwrap();
        let (parts, header) = split(&token);
        assert_eq!(
            verify(&parts, &header, &Policy::new(), &config.pbes2, &short),
            Err(TokenError::DecryptionFailed)
        );
    }

    #[test]
    fn pbes2_header_and_salt() {
        let config = JoseConfig::default();
        let token = generate(
            "PBES2-HS256+A128KW",
            "A128GCM",
            &claims(),
            &KeyMaterial::from("hunter2"),
            Some("pw"),
            &config,
        )
        .unwrap();
        let (_, header) = split(&token);
        let keys: Vec<&str> = header.keys().map(String::as_str).collect();
        assert_eq!(keys, ["alg", "enc", "kid", "p2c", "p2s"]);
        assert_eq!(header["p2c"], json!(1024));
        let salt = base64url::decode(header["p2s"].as_str().unwrap()).unwrap();
        assert_eq!(&salt[..19], b"PBES2-HS256+A128KW\0");
        assert_eq!(salt.len(), 19 + 8);
    }

    #[test]
    fn header_check_order() {
        let pbes2 = Pbes2Config::default();
        let policy = Policy::new();
        let check = |header: Value, policy: &Policy| {
            let Value::Object(header) = header else { unreachable!() };
            plan_decryption(&header, policy, &pbes2, Mode::Sync).map(|_| ())
        };

        assert_eq!(check(json!({ "enc": "A128GCM" }), &policy), Err(TokenError::MissingAlg));
        assert_eq!(check(json!({ "alg": "xx" }), &policy), Err(TokenError::MissingEnc));
        assert_eq!(
            check(json!({ "alg": "RSA1_5", "enc": "nope" }), &policy),
            Err(TokenError::UnrecognizedKeyManagement("RSA1_5".into()))
        );
        assert_eq!(
            check(
                json!({ "alg": "dir", "enc": "nope" }),
                &Policy::new().with_algorithms("A128KW")
            ),
            Err(TokenError::UnwantedKeyManagement("dir".into()))
        );
        assert_eq!(
            check(json!({ "alg": "dir", "enc": "nope" }), &policy),
            Err(TokenError::UnrecognizedContentEncryption("nope".into()))
        );
        assert_eq!(
            check(
                json!({ "alg": "dir", "enc": "A128GCM" }),
                &Policy::new().with_encryptions("A256GCM")
            ),
            Err(TokenError::UnwantedContentEncryption("A128GCM".into()))
        );
    }

    #[test]
    fn p2c_bounds() {
        let pbes2 = Pbes2Config::default();
        let plan = |p2c: Value, mode: Mode| {
            let Value::Object(header) = json!({
                "alg": "PBES2-HS512+A256KW",
                "enc": "A256GCM",
                "p2c": p2c,
                "p2s": "c2FsdA",
            }) else {
                unreachable!()
            };
            plan_decryption(&header, &Policy::new(), &pbes2, mode).map(|_| ())
        };

        assert_eq!(plan(json!(0), Mode::Async), Err(TokenError::InvalidP2c));
        assert_eq!(plan(json!(-1), Mode::Async), Err(TokenError::InvalidP2c));
        assert_eq!(plan(json!(1.5), Mode::Async), Err(TokenError::InvalidP2c));
        assert_eq!(plan(json!("1000"), Mode::Async), Err(TokenError::InvalidP2c));
        assert_eq!(plan(json!(100_001), Mode::Async), Err(TokenError::InvalidP2c));
        assert_eq!(plan(json!(100_000), Mode::Async), Ok(()));
        assert_eq!(plan(json!(2048), Mode::Sync), Ok(()));
        assert_eq!(plan(json!(2049), Mode::Sync), Err(TokenError::P2cTooLargeForSync));
        assert_eq!(plan(json!(100_001), Mode::Sync), Err(TokenError::InvalidP2c));
    }

    #[test]
    fn p2s_must_be_a_base64_string() {
        let pbes2 = Pbes2Config::default();
        for p2s in [json!(null), json!(12), json!("not*base64")] {
            let Value::Object(header) = json!({
                "alg": "PBES2-HS256+A128KW",
                "enc": "A128GCM",
                "p2c": 1000,
                "p2s": p2s,
            }) else {
                unreachable!()
            };
            assert_eq!(
                plan_decryption(&header, &Policy::new(), &pbes2, Mode::Sync).map(|_| ()),
                Err(TokenError::InvalidP2s)
            );
        }
    }

    #[test]
    fn non_object_plaintext_is_not_parsable() {
        let config = JoseConfig::default();
        let key = KeyMaterial::from(vec![5u8; 16]);
        let plan = plan_generation("A128KW", "A128GCM", None, &config.pbes2).unwrap();
        let token = {
            // seal a bare JSON array instead of a claim set
            let cek = Zeroizing::new(plan.enc.generate_cek());
            let wrapped = key_wrap::wrap(&[5u8; 16], &cek, 128).unwrap();
            let sealed = plan.enc.encrypt(&cek, plan.protected.as_bytes(), b"[1,2]").unwrap();
            format!(
                "{}.{}.{}.{}.{}",
                plan.protected,
                base64url::encode(wrapped),
                base64url::encode(&sealed.iv),
                base64url::encode(&sealed.ciphertext),
                base64url::encode(&sealed.tag)
            )
        };
        let (parts, header) = split(&token);
        assert!(matches!(
            verify(&parts, &header, &Policy::new(), &config.pbes2, &key),
            Err(TokenError::NonParsablePayload(_))
        ));
    }
}
