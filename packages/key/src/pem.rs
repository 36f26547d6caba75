//! PEM decoding for RSA and EC keys
//!
//! Private keys: PKCS#1 (`RSA PRIVATE KEY`), SEC1 (`EC PRIVATE KEY`) and
//! PKCS#8 (`PRIVATE KEY`). Public keys: SPKI (`PUBLIC KEY`), PKCS#1
//! (`RSA PUBLIC KEY`) and X.509 certificates (`CERTIFICATE`). Public key
//! loaders also accept a private key and derive its public half.

use crate::error::{KeyError, Result};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Block type of a PEM document, taken from its first `BEGIN` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PemKind {
    /// PKCS#1 RSA private key
    RsaPrivate,
    /// SEC1 EC private key
    EcPrivate,
    /// PKCS#8 private key
    Private,
    /// SPKI public key
    Public,
    /// PKCS#1 RSA public key
    RsaPublic,
    /// X.509 certificate
    Certificate,
}

impl PemKind {
    /// Detect the block type of `pem`
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyFormat` when there is no `BEGIN` line or the label
    /// is not a supported key type.
    pub fn detect(pem: &str) -> Result<Self> {
        let label = pem
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix("-----BEGIN ")?.strip_suffix("-----"))
            .ok_or_else(|| KeyError::invalid_format("no PEM BEGIN line"))?;
        match label {
            "RSA PRIVATE KEY" => Ok(PemKind::RsaPrivate),
            "EC PRIVATE KEY" => Ok(PemKind::EcPrivate),
            "PRIVATE KEY" => Ok(PemKind::Private),
            "PUBLIC KEY" => Ok(PemKind::Public),
            "RSA PUBLIC KEY" => Ok(PemKind::RsaPublic),
            "CERTIFICATE" => Ok(PemKind::Certificate),
            other => Err(KeyError::invalid_format(format!("unsupported PEM label {other}"))),
        }
    }
}

fn malformed(kind: PemKind) -> impl Fn(String) -> KeyError {
    move |detail| KeyError::invalid_format(format!("malformed {kind:?} PEM: {detail}"))
}

fn wrong_type(kind: PemKind, wanted: &str) -> KeyError {
    KeyError::invalid_key(format!("{kind:?} PEM cannot be used as {wanted}"))
}

/// SubjectPublicKeyInfo DER of the certificate in `pem`
///
/// # Errors
///
/// Returns `InvalidKeyFormat` when the PEM or the certificate does not parse.
pub fn certificate_spki(pem: &str) -> Result<Vec<u8>> {
    let (_, block) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|e| KeyError::invalid_format(format!("certificate PEM: {e}")))?;
    let cert = block
        .parse_x509()
        .map_err(|e| KeyError::invalid_format(format!("certificate: {e}")))?;
    Ok(cert.public_key().raw.to_vec())
}

/// RSA private key from PKCS#1 or PKCS#8 PEM
///
/// # Errors
///
/// Fails on malformed PEM or a non-RSA key.
pub fn rsa_private_key(pem: &str) -> Result<RsaPrivateKey> {
    let kind = PemKind::detect(pem)?;
    match kind {
        PemKind::RsaPrivate => {
            RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| malformed(kind)(e.to_string()))
        }
        PemKind::Private => {
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| malformed(kind)(e.to_string()))
        }
        other => Err(wrong_type(other, "an RSA private key")),
    }
}

/// RSA public key from SPKI, PKCS#1, certificate or private key PEM
///
/// # Errors
///
/// Fails on malformed PEM or a non-RSA key.
pub fn rsa_public_key(pem: &str) -> Result<RsaPublicKey> {
    let kind = PemKind::detect(pem)?;
    match kind {
        PemKind::Public => {
            RsaPublicKey::from_public_key_pem(pem).map_err(|e| malformed(kind)(e.to_string()))
        }
        PemKind::RsaPublic => {
            RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| malformed(kind)(e.to_string()))
        }
        PemKind::Certificate => RsaPublicKey::from_public_key_der(&certificate_spki(pem)?)
            .map_err(|e| malformed(kind)(e.to_string())),
        PemKind::RsaPrivate | PemKind::Private => Ok(rsa_private_key(pem)?.to_public_key()),
        PemKind::EcPrivate => Err(wrong_type(kind, "an RSA public key")),
    }
}

macro_rules! ec_key_loaders {
    ($curve:ident, $signing:ident, $verifying:ident, $name:literal) => {
        #[doc = concat!($name, " signing key from SEC1 or PKCS#8 PEM")]
        ///
        /// # Errors
        ///
        /// Fails on malformed PEM or a key on another curve.
        pub fn $signing(pem: &str) -> Result<::$curve::ecdsa::SigningKey> {
            let kind = PemKind::detect(pem)?;
            let secret = match kind {
                PemKind::EcPrivate => ::$curve::SecretKey::from_sec1_pem(pem)
                    .map_err(|e| malformed(kind)(e.to_string()))?,
                PemKind::Private => {
                    <::$curve::SecretKey as ::$curve::pkcs8::DecodePrivateKey>::from_pkcs8_pem(pem)
                        .map_err(|e| malformed(kind)(e.to_string()))?
                }
                other => return Err(wrong_type(other, concat!("a ", $name, " private key"))),
            };
            ::$curve::ecdsa::SigningKey::from_bytes(&secret.to_bytes())
                .map_err(|e| KeyError::invalid_key(e.to_string()))
        }

        #[doc = concat!($name, " verifying key from SPKI, certificate or private key PEM")]
        ///
        /// # Errors
        ///
        /// Fails on malformed PEM or a key on another curve.
        pub fn $verifying(pem: &str) -> Result<::$curve::ecdsa::VerifyingKey> {
            let kind = PemKind::detect(pem)?;
            let public = match kind {
                PemKind::Public => {
                    <::$curve::PublicKey as ::$curve::pkcs8::DecodePublicKey>::from_public_key_pem(pem)
                        .map_err(|e| malformed(kind)(e.to_string()))?
                }
                PemKind::Certificate => {
                    let spki = certificate_spki(pem)?;
                    <::$curve::PublicKey as ::$curve::pkcs8::DecodePublicKey>::from_public_key_der(&spki)
                        .map_err(|e| malformed(kind)(e.to_string()))?
                }
                PemKind::EcPrivate | PemKind::Private => {
                    return Ok(::$curve::ecdsa::VerifyingKey::from(&$signing(pem)?));
                }
                other => return Err(wrong_type(other, concat!("a ", $name, " public key"))),
            };
            ::$curve::ecdsa::VerifyingKey::from_sec1_bytes(&public.to_sec1_bytes())
                .map_err(|e| KeyError::invalid_key(e.to_string()))
        }
    };
}

ec_key_loaders!(p256, p256_signing_key, p256_verifying_key, "P-256");
ec_key_loaders!(p384, p384_signing_key, p384_verifying_key, "P-384");
ec_key_loaders!(p521, p521_signing_key, p521_verifying_key, "P-521");
