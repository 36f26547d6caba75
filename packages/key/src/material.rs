//! Key material and keystores
//!
//! [`KeyMaterial`] is deliberately untyped: the algorithm that consumes it
//! decides whether text is base64, a password or PEM.

use crate::error::{KeyError, Result};
use joset_common::{LoggingTransformer, base64url};
use std::collections::HashMap;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// Raw key bytes or key text, zeroized on drop
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Raw bytes: a symmetric key, a password, or UTF-8 PEM
    Bytes(Vec<u8>),
    /// Text: base64 for symmetric keys, a password, or PEM
    Text(String),
}

impl KeyMaterial {
    /// `true` when no key bytes are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            KeyMaterial::Bytes(b) => b.is_empty(),
            KeyMaterial::Text(t) => t.is_empty(),
        }
    }

    /// Secret for HMAC, `dir` and AES key wrap
    ///
    /// Bytes are used as is; text is base64 (standard or URL-safe alphabet,
    /// padding optional).
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyFormat` when text is not valid base64.
    pub fn symmetric_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            KeyMaterial::Bytes(b) => Ok(Zeroizing::new(b.clone())),
            KeyMaterial::Text(t) => base64url::decode_lenient(t)
                .map(Zeroizing::new)
                .map_err(|e| KeyError::invalid_format(format!("symmetric key text: {e}"))),
        }
    }

    /// Password for PBES2: bytes as is, text as its UTF-8 encoding
    #[must_use]
    pub fn password_bytes(&self) -> &[u8] {
        match self {
            KeyMaterial::Bytes(b) => b,
            KeyMaterial::Text(t) => t.as_bytes(),
        }
    }

    /// PEM text for asymmetric algorithms
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyFormat` when bytes are not UTF-8.
    pub fn pem_text(&self) -> Result<&str> {
        match self {
            KeyMaterial::Bytes(b) => std::str::from_utf8(b)
                .map_err(|_| KeyError::invalid_format("PEM key bytes are not UTF-8")),
            KeyMaterial::Text(t) => Ok(t),
        }
    }

    /// Loggable fingerprint of the material
    #[must_use]
    pub fn fingerprint(&self) -> String {
        match self {
            KeyMaterial::Bytes(b) => LoggingTransformer::key_fingerprint(b),
            KeyMaterial::Text(t) => LoggingTransformer::key_fingerprint(t),
        }
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        match self {
            KeyMaterial::Bytes(b) => b.zeroize(),
            KeyMaterial::Text(t) => t.zeroize(),
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Bytes(_) => write!(f, "KeyMaterial::Bytes({})", self.fingerprint()),
            KeyMaterial::Text(_) => write!(f, "KeyMaterial::Text({})", self.fingerprint()),
        }
    }
}

impl From<Vec<u8>> for KeyMaterial {
    fn from(bytes: Vec<u8>) -> Self {
        KeyMaterial::Bytes(bytes)
    }
}

impl From<&[u8]> for KeyMaterial {
    fn from(bytes: &[u8]) -> Self {
        KeyMaterial::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for KeyMaterial {
    fn from(bytes: &[u8; N]) -> Self {
        KeyMaterial::Bytes(bytes.to_vec())
    }
}

impl From<String> for KeyMaterial {
    fn from(text: String) -> Self {
        KeyMaterial::Text(text)
    }
}

impl From<&str> for KeyMaterial {
    fn from(text: &str) -> Self {
        KeyMaterial::Text(text.to_string())
    }
}

/// A single key or a keystore indexed by `kid`
#[derive(Debug, Clone)]
pub enum KeyRef {
    /// One key used regardless of the header `kid`
    Direct(KeyMaterial),
    /// Keys selected by the header `kid`
    Keystore(HashMap<String, KeyMaterial>),
}

impl KeyRef {
    /// Build a keystore from `(kid, material)` pairs
    pub fn keystore<I, K, M>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, M)>,
        K: Into<String>,
        M: Into<KeyMaterial>,
    {
        KeyRef::Keystore(
            entries
                .into_iter()
                .map(|(kid, material)| (kid.into(), material.into()))
                .collect(),
        )
    }

    /// Non-empty keystore entry for `kid`
    ///
    /// A direct key is never returned here: callers resolve it without a
    /// `kid`.
    #[must_use]
    pub fn lookup(&self, kid: &str) -> Option<&KeyMaterial> {
        match self {
            KeyRef::Direct(_) => None,
            KeyRef::Keystore(store) => store.get(kid).filter(|m| !m.is_empty()),
        }
    }

    /// Key to sign or encrypt with
    ///
    /// A direct key is always used; a keystore needs a `kid` naming a
    /// non-empty entry.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKeyId` when the keystore has no usable entry.
    pub fn resolve(&self, kid: Option<&str>) -> Result<&KeyMaterial> {
        match self {
            KeyRef::Direct(material) => Ok(material),
            KeyRef::Keystore(_) => kid
                .and_then(|kid| self.lookup(kid))
                .ok_or_else(|| KeyError::UnknownKeyId(kid.map(str::to_string))),
        }
    }
}

macro_rules! direct_key_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for KeyRef {
                fn from(material: $ty) -> Self {
                    KeyRef::Direct(material.into())
                }
            }
        )*
    };
}

direct_key_from!(KeyMaterial, Vec<u8>, &[u8], String, &str);

impl<const N: usize> From<&[u8; N]> for KeyRef {
    fn from(bytes: &[u8; N]) -> Self {
        KeyRef::Direct(bytes.into())
    }
}
