//! JWS generation and verification through the public API

use joset_common::{LoggingTransformer, base64url};
use joset_jwt::{
    Jose, JoseConfig, JwsAlgorithm, JwtError, KeyMaterial, KeyRef, Outcome, TokenError, generate_jws,
    parse,
};
use serde_json::{Value, json};

macro_rules! fixture {
    ($name:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/pem_keys/", $name))
    };
}

fn claims() -> Value {
    json!({ "sub": "alice", "scope": ["read", "write"], "n": 42 })
}

fn assert_round_trip(alg: &str, signing: &KeyRef, verifying: &KeyRef) {
    let token = generate_jws(alg, &claims(), signing, None).unwrap();
    assert_eq!(token.split('.').count(), 3);
    let verified = parse(&token).set_algorithm_list(alg).verify(verifying);
    assert_eq!(verified.outcome(), &Outcome::Valid, "{alg}");
    let payload = verified.into_payload().unwrap();
    assert_eq!(payload["sub"], "alice");
    assert_eq!(payload["scope"], json!(["read", "write"]));
    assert!(payload["iat"].as_i64().unwrap() > 1_600_000_000);
}

#[test]
fn test_hmac_round_trip_with_bytes_and_base64_text() {
    LoggingTransformer::init_test();
    let secret = vec![0x5au8; 64];
    let text = base64url::encode(&secret);
    for alg in ["HS256", "HS384", "HS512"] {
        assert_round_trip(alg, &KeyRef::from(secret.clone()), &KeyRef::from(text.as_str()));
    }
}

#[test]
fn test_rsa_round_trip_with_every_key_encoding() {
    LoggingTransformer::init_test();
    for alg in ["RS256", "RS384", "RS512"] {
        for signing in [fixture!("rsa_private.pem"), fixture!("rsa_private_pkcs8.pem")] {
            for verifying in [
                fixture!("rsa_public.pem"),
                fixture!("rsa_public_pkcs1.pem"),
                fixture!("rsa_cert.pem"),
                fixture!("rsa_private.pem"),
            ] {
                assert_round_trip(alg, &KeyRef::from(signing), &KeyRef::from(verifying));
            }
        }
        // PEM supplied as bytes
        assert_round_trip(
            alg,
            &KeyRef::from(fixture!("rsa_private.pem").as_bytes()),
            &KeyRef::from(fixture!("rsa_public.pem").as_bytes().to_vec()),
        );
    }
}

#[test]
fn test_ecdsa_round_trip_per_curve() {
    LoggingTransformer::init_test();
    let cases = [
        ("ES256", fixture!("ec256_private.pem"), fixture!("ec256_public.pem"), fixture!("ec256_cert.pem"), 64),
        ("ES384", fixture!("ec384_private.pem"), fixture!("ec384_public.pem"), fixture!("ec384_cert.pem"), 96),
        ("ES512", fixture!("ec521_private.pem"), fixture!("ec521_public.pem"), fixture!("ec521_cert.pem"), 132),
    ];
    for (alg, private, public, cert, sig_len) in cases {
        let signing = KeyRef::from(private);
        for verifying in [public, cert, private] {
            assert_round_trip(alg, &signing, &KeyRef::from(verifying));
        }
        let token = generate_jws(alg, &claims(), &signing, None).unwrap();
        let signature = base64url::decode(token.rsplit('.').next().unwrap()).unwrap();
        assert_eq!(signature.len(), sig_len, "{alg} signature is fixed width");
    }
    assert_round_trip(
        "ES256",
        &KeyRef::from(fixture!("ec256_private_pkcs8.pem")),
        &KeyRef::from(fixture!("ec256_public.pem")),
    );
}

#[test]
fn test_ecdsa_signature_of_wrong_width_fails_closed() {
    let token = generate_jws("ES256", &claims(), &KeyRef::from(fixture!("ec256_private.pem")), None).unwrap();
    let (signing_input, signature) = token.rsplit_once('.').unwrap();
    let mut signature = base64url::decode(signature).unwrap();
    signature.push(0);
    let token = format!("{signing_input}.{}", base64url::encode(signature));
    let verified = parse(&token).verify(&KeyRef::from(fixture!("ec256_public.pem")));
    assert_eq!(verified.error(), Some(&TokenError::IntegrityCheckFailed));
}

/// Signing and verifying keys for `alg`
fn keys_for(alg: JwsAlgorithm) -> (KeyRef, KeyRef) {
    match alg {
        JwsAlgorithm::Hs256 | JwsAlgorithm::Hs384 | JwsAlgorithm::Hs512 => {
            (KeyRef::from(vec![1u8; 64]), KeyRef::from(vec![1u8; 64]))
        }
        JwsAlgorithm::Rs256 | JwsAlgorithm::Rs384 | JwsAlgorithm::Rs512 => (
            KeyRef::from(fixture!("rsa_private.pem")),
            KeyRef::from(fixture!("rsa_public.pem")),
        ),
        JwsAlgorithm::Es256 => (
            KeyRef::from(fixture!("ec256_private.pem")),
            KeyRef::from(fixture!("ec256_public.pem")),
        ),
        JwsAlgorithm::Es384 => (
            KeyRef::from(fixture!("ec384_private.pem")),
            KeyRef::from(fixture!("ec384_public.pem")),
        ),
        JwsAlgorithm::Es512 => (
            KeyRef::from(fixture!("ec521_private.pem")),
            KeyRef::from(fixture!("ec521_public.pem")),
        ),
    }
}

/// Same bytes, different spelling: sets an unused trailing bit
fn respell_last(segment: &str) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    assert_ne!(segment.len() % 4, 0, "segment has no unused bits");
    let mut bytes = segment.as_bytes().to_vec();
    let last = bytes.last_mut().unwrap();
    let value = ALPHABET.iter().position(|c| c == last).unwrap();
    *last = ALPHABET[value ^ 1];
    String::from_utf8(bytes).unwrap()
}

#[test]
fn test_tampering_is_detected_for_every_algorithm() {
    for alg in JwsAlgorithm::ALL {
        let (signing, verifying) = keys_for(alg);
        let token = generate_jws(alg.name(), &claims(), &signing, None).unwrap();
        assert!(parse(&token).verify(&verifying).is_valid(), "{alg}");
        let parts: Vec<&str> = token.split('.').collect();

        let other_header = base64url::encode(format!(r#"{{"alg":"{alg}","x":1}}"#));
        let other_payload = base64url::encode(br#"{"sub":"mallory","iat":1700000000}"#);
        let mut flipped = base64url::decode(parts[2]).unwrap();
        flipped[0] ^= 1;
        let mut spaced = parts[2].to_string();
        spaced.insert(4, ' ');

        let mut tampered = vec![
            format!("{other_header}.{}.{}", parts[1], parts[2]),
            format!("{}.{other_payload}.{}", parts[0], parts[2]),
            format!("{}.{}.{}", parts[0], parts[1], base64url::encode(flipped)),
            format!("{}.{}.", parts[0], parts[1]),
            format!("{}.{}.{spaced}", parts[0], parts[1]),
            format!("{}.{}.{}", parts[0], parts[1], parts[2].replace('-', "+").replace('_', "/")),
        ];
        if parts[2].len() % 4 != 0 {
            tampered.push(format!("{}.{}.{}", parts[0], parts[1], respell_last(parts[2])));
        }

        for token in tampered.into_iter().filter(|t| t != &token) {
            let verified = parse(&token).verify(&verifying);
            assert_eq!(verified.error(), Some(&TokenError::IntegrityCheckFailed), "{alg}: {token}");
            assert!(!verified.is_valid());
        }
    }
}

#[test]
fn test_respelled_hmac_signature_is_rejected() {
    let key = KeyRef::from(vec![1u8; 32]);
    let token = generate_jws("HS256", &claims(), &key, None).unwrap();
    let (signing_input, signature) = token.rsplit_once('.').unwrap();
    // 32 bytes leave two unused bits in the last character
    assert_eq!(signature.len(), 43);
    let respelled = format!("{signing_input}.{}", respell_last(signature));
    assert_eq!(
        base64url::decode_lenient(respell_last(signature)).unwrap(),
        base64url::decode(signature).unwrap()
    );
    assert_eq!(
        parse(&respelled).verify(&key).error(),
        Some(&TokenError::IntegrityCheckFailed)
    );
}

// RFC 7515 appendix A.1; the payload carries `exp` but no `iat`
const RFC7515_HS256: &str = "eyJ0eXAiOiJKV1QiLA0KICJhbGciOiJIUzI1NiJ9.\
eyJpc3MiOiJqb2UiLA0KICJleHAiOjEzMDA4MTkzODAsDQogImh0dHA6Ly9leGFtcGxlLmNvbS9pc19yb290Ijp0cnVlfQ.\
dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
const RFC7515_HS256_KEY: &str =
    "AyM1SysPpbyDfgZld3umj1qzKObwVMkoqQ-EstJQLr_T-1qS0gZH75aKtMN3Yj0iPS4hcgUuTwjAzZr1Z9CAow";

// RFC 7515 appendix A.3
const RFC7515_ES256: &str = "eyJhbGciOiJFUzI1NiJ9.\
eyJpc3MiOiJqb2UiLA0KICJleHAiOjEzMDA4MTkzODAsDQogImh0dHA6Ly9leGFtcGxlLmNvbS9pc19yb290Ijp0cnVlfQ.\
DtEhU3ljbEg8L38VWAfUAqOyKAM6-Xx-F4GawxaepmXFCgfTjDxw5djxLa8ISlSApmWQxfKTUJqPP3-Kg6NU1Q";

#[test]
fn test_rfc7515_vectors_pass_the_integrity_check() {
    let cases = [
        (RFC7515_HS256, KeyRef::from(RFC7515_HS256_KEY)),
        (RFC7515_ES256, KeyRef::from(fixture!("rfc7515_es256_public.pem"))),
    ];
    for (token, key) in cases {
        let parsed = parse(token);
        assert_eq!(parsed.payload().unwrap()["exp"], json!(1_300_819_380));
        // the signature verifies, so the claim checks run and find no iat
        let verified = parsed.verify(&key);
        assert_eq!(verified.error(), Some(&TokenError::InvalidIat));

        let (signing_input, signature) = token.rsplit_once('.').unwrap();
        let mut signature = base64url::decode(signature).unwrap();
        signature[5] ^= 0x80;
        let tampered = format!("{signing_input}.{}", base64url::encode(signature));
        assert_eq!(
            parse(&tampered).verify(&key).error(),
            Some(&TokenError::IntegrityCheckFailed)
        );
    }
}

#[test]
fn test_key_mismatch_fails_closed() {
    let token = generate_jws("RS256", &claims(), &KeyRef::from(fixture!("rsa_private.pem")), None).unwrap();
    for wrong in [
        KeyRef::from(fixture!("rsa_other_private.pem")),
        KeyRef::from(fixture!("ec256_public.pem")),
        KeyRef::from("not a pem"),
        KeyRef::from(vec![0xffu8, 0xfe]),
    ] {
        let verified = parse(&token).verify(&wrong);
        assert_eq!(verified.error(), Some(&TokenError::IntegrityCheckFailed));
    }

    let secret = vec![7u8; 32];
    let token = generate_jws("HS256", &claims(), &KeyRef::from(secret.clone()), None).unwrap();
    // hex text is decoded as base64, giving a different key
    let hex_text = KeyRef::from(hex::encode(&secret));
    assert_eq!(
        parse(&token).verify(&hex_text).error(),
        Some(&TokenError::IntegrityCheckFailed)
    );
    let truncated = KeyRef::from(secret[..31].to_vec());
    assert_eq!(
        parse(&token).verify(&truncated).error(),
        Some(&TokenError::IntegrityCheckFailed)
    );
}

#[test]
fn test_generation_errors() {
    let secret = KeyRef::from(vec![1u8; 31]);
    assert!(matches!(
        generate_jws("HS256", &claims(), &secret, None),
        Err(JwtError::InvalidKey(_))
    ));
    assert_eq!(
        generate_jws("PS256", &claims(), &KeyRef::from(vec![1u8; 64]), None),
        Err(JwtError::UnrecognizedAlgorithm("PS256".into()))
    );
    assert!(matches!(
        generate_jws("ES256", &claims(), &KeyRef::from(fixture!("rsa_private.pem")), None),
        Err(JwtError::InvalidKey(_))
    ));
    assert!(generate_jws("RS256", &claims(), &KeyRef::from(fixture!("rsa_public.pem")), None).is_err());
}

#[test]
fn test_algorithm_allow_list() {
    let key = KeyRef::from(vec![1u8; 64]);
    let token = generate_jws("HS256", &claims(), &key, None).unwrap();

    let verified = parse(&token).set_algorithm_list(["HS384", "HS512"]).verify(&key);
    assert_eq!(verified.error(), Some(&TokenError::UnwantedAlgorithm("HS256".into())));
    assert_eq!(verified.error().unwrap().to_string(), "Unwanted algorithm HS256");

    let verified = parse(&token).set_algorithm_list(vec!["HS256", "HS512"]).verify(&key);
    assert!(verified.is_valid());
}

#[test]
fn test_header_without_usable_alg() {
    let key = KeyRef::from(vec![1u8; 64]);
    let payload = base64url::encode(br#"{"iat":1700000000}"#);
    for (header, expected) in [
        (r#"{"typ":"JWT"}"#, TokenError::MissingAlg),
        (r#"{"alg":null}"#, TokenError::MissingAlg),
        (r#"{"alg":"none"}"#, TokenError::UnrecognizedAlgorithm("none".into())),
    ] {
        let token = format!("{}.{payload}.", base64url::encode(header));
        assert_eq!(parse(&token).verify(&key).error(), Some(&expected));
    }
}

#[test]
fn test_audience_and_issuer() {
    let key = KeyRef::from(vec![1u8; 32]);
    let token = generate_jws("HS256", &json!({ "aud": "api", "iss": "auth" }), &key, None).unwrap();
    let bare = generate_jws("HS256", &json!({}), &key, None).unwrap();

    assert!(parse(&token).set_audience(["web", "api"]).set_issuer("auth").verify(&key).is_valid());
    assert_eq!(
        parse(&bare).set_audience("api").verify(&key).error(),
        Some(&TokenError::MissingAudience)
    );
    assert_eq!(
        parse(&token).set_audience("web").verify(&key).error(),
        Some(&TokenError::MismatchingAudience)
    );
    assert_eq!(
        parse(&bare).set_issuer("auth").verify(&key).error(),
        Some(&TokenError::MissingIssuer)
    );
    let verified = parse(&token).set_issuer(vec!["other".to_string()]).verify(&key);
    assert_eq!(verified.error().unwrap().to_string(), "Mismatching iss claim in payload");
}

#[test]
fn test_expiration_with_fixed_clock() {
    let issued = 1_700_000_000;
    let key = KeyRef::from(vec![1u8; 32]);
    let issuer = Jose::new(JoseConfig::default().with_fixed_time(issued * 1000));
    let token = issuer.generate_jws("HS256", &json!({}), &key, None).unwrap();
    let with_exp = issuer
        .generate_jws("HS256", &json!({ "exp": issued + 4 }), &key, None)
        .unwrap();

    let at = |secs: i64| Jose::new(JoseConfig::default().with_fixed_time(secs * 1000));

    // no exp and no lifetime never expires
    assert!(at(issued + 1_000_000).parse(&token).verify(&key).is_valid());

    let verified = at(issued + 60).parse(&token).set_token_lifetime(60).verify(&key);
    assert!(verified.is_valid());
    let verified = at(issued + 61).parse(&token).set_token_lifetime(60).verify(&key);
    assert_eq!(verified.expired(), Some(issued + 60));
    assert_eq!(verified.payload().unwrap()["iat"], json!(issued));

    let verified = at(issued + 5).parse(&with_exp).set_token_lifetime(60).verify(&key);
    assert_eq!(verified.outcome(), &Outcome::Expired(issued + 4));
    assert!(at(issued + 3).parse(&with_exp).verify(&key).is_valid());
}

#[test]
fn test_keystore_resolution() {
    let store = KeyRef::keystore([
        ("hmac", KeyMaterial::from(vec![1u8; 32])),
        ("rsa", KeyMaterial::from(fixture!("rsa_private.pem"))),
        ("empty", KeyMaterial::from(Vec::new())),
    ]);

    let token = generate_jws("RS256", &claims(), &store, Some("rsa")).unwrap();
    let verified = parse(&token).verify(&store);
    assert!(verified.is_valid());
    assert_eq!(verified.header().unwrap()["kid"], "rsa");

    assert_eq!(
        generate_jws("HS256", &claims(), &store, Some("missing")),
        Err(JwtError::InvalidKeyId)
    );
    assert_eq!(
        generate_jws("HS256", &claims(), &store, Some("empty")),
        Err(JwtError::InvalidKeyId)
    );

    // a token naming a kid the verifier does not hold
    let other_store = KeyRef::keystore([("other", vec![1u8; 32])]);
    let token = generate_jws("HS256", &claims(), &store, Some("hmac")).unwrap();
    let error = parse(&token).verify(&other_store).error().cloned().unwrap();
    assert_eq!(error, TokenError::KeyNotFound { kid: "hmac".into() });

    // a direct key ignores the kid header
    assert!(parse(&token).verify(&KeyRef::from(vec![1u8; 32])).is_valid());
}
