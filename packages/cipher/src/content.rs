//! JWE content encryption (RFC 7518 §5)
//!
//! Two families are supported: AES-GCM with a 96-bit IV and a 128-bit tag,
//! and the composite AES-CBC + HMAC-SHA2 construction of RFC 7518 §5.2.

use crate::error::{CipherError, Result};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::{
    AeadInPlace, Aes128Gcm, Aes256Gcm, AesGcm, KeyInit,
    aead::{consts::U12, generic_array::GenericArray},
};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

type Aes192Gcm = AesGcm<Aes192, U12>;

const GCM_IV_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;
const CBC_IV_LEN: usize = 16;

/// Content encryption algorithm (`enc` header value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncryption {
    /// AES-128-GCM
    A128Gcm,
    /// AES-192-GCM
    A192Gcm,
    /// AES-256-GCM
    A256Gcm,
    /// AES-128-CBC with HMAC-SHA-256
    A128CbcHs256,
    /// AES-192-CBC with HMAC-SHA-384
    A192CbcHs384,
    /// AES-256-CBC with HMAC-SHA-512
    A256CbcHs512,
}

/// Output of content encryption, one field per compact JWE segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Initialization vector
    pub iv: Vec<u8>,
    /// Ciphertext
    pub ciphertext: Vec<u8>,
    /// Authentication tag
    pub tag: Vec<u8>,
}

impl ContentEncryption {
    /// Every supported method
    pub const ALL: [ContentEncryption; 6] = [
        ContentEncryption::A128Gcm,
        ContentEncryption::A192Gcm,
        ContentEncryption::A256Gcm,
        ContentEncryption::A128CbcHs256,
        ContentEncryption::A192CbcHs384,
        ContentEncryption::A256CbcHs512,
    ];

    /// The `enc` header value
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ContentEncryption::A128Gcm => "A128GCM",
            ContentEncryption::A192Gcm => "A192GCM",
            ContentEncryption::A256Gcm => "A256GCM",
            ContentEncryption::A128CbcHs256 => "A128CBC-HS256",
            ContentEncryption::A192CbcHs384 => "A192CBC-HS384",
            ContentEncryption::A256CbcHs512 => "A256CBC-HS512",
        }
    }

    /// Content encryption key length in bytes
    ///
    /// CBC-HMAC keys carry the MAC key and the encryption key, hence twice
    /// the AES key size.
    #[must_use]
    pub const fn cek_len(self) -> usize {
        match self {
            ContentEncryption::A128Gcm => 16,
            ContentEncryption::A192Gcm => 24,
            ContentEncryption::A256Gcm | ContentEncryption::A128CbcHs256 => 32,
            ContentEncryption::A192CbcHs384 => 48,
            ContentEncryption::A256CbcHs512 => 64,
        }
    }

    /// IV length in bytes
    #[must_use]
    pub const fn iv_len(self) -> usize {
        if self.is_gcm() { GCM_IV_LEN } else { CBC_IV_LEN }
    }

    #[inline]
    const fn is_gcm(self) -> bool {
        matches!(
            self,
            ContentEncryption::A128Gcm | ContentEncryption::A192Gcm | ContentEncryption::A256Gcm
        )
    }

    /// Fresh random content encryption key of the right size
    #[must_use]
    pub fn generate_cek(self) -> Vec<u8> {
        random_bytes(self.cek_len())
    }

    /// Encrypt `plaintext` under `cek` with a fresh random IV
    ///
    /// # Errors
    ///
    /// Fails when `cek` is not exactly [`cek_len`](Self::cek_len) bytes.
    pub fn encrypt(self, cek: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Sealed> {
        let iv = random_bytes(self.iv_len());
        self.encrypt_with_iv(cek, &iv, aad, plaintext)
    }

    /// Encrypt with a caller supplied IV
    ///
    /// # Errors
    ///
    /// Fails on wrong CEK or IV length.
    pub fn encrypt_with_iv(self, cek: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Sealed> {
        self.check_lengths(cek, iv)?;
        let (ciphertext, tag) = match self {
            ContentEncryption::A128Gcm => gcm_seal::<Aes128Gcm>(cek, iv, aad, plaintext)?,
            ContentEncryption::A192Gcm => gcm_seal::<Aes192Gcm>(cek, iv, aad, plaintext)?,
            ContentEncryption::A256Gcm => gcm_seal::<Aes256Gcm>(cek, iv, aad, plaintext)?,
            ContentEncryption::A128CbcHs256
            | ContentEncryption::A192CbcHs384
            | ContentEncryption::A256CbcHs512 => {
                let (mac_key, enc_key) = cek.split_at(cek.len() / 2);
                let ciphertext = cbc_encrypt(self, enc_key, iv, plaintext)?;
                let tag = self.cbc_tag(mac_key, aad, iv, &ciphertext)?;
                (ciphertext, tag)
            }
        };
        Ok(Sealed {
            iv: iv.to_vec(),
            ciphertext,
            tag,
        })
    }

    /// Authenticate and decrypt
    ///
    /// For CBC-HMAC the tag is checked in constant time before any
    /// decryption happens.
    ///
    /// # Errors
    ///
    /// Fails on wrong lengths, tag mismatch or bad padding.
    pub fn decrypt(self, cek: &[u8], iv: &[u8], aad: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
        self.check_lengths(cek, iv)?;
        match self {
            ContentEncryption::A128Gcm => gcm_open::<Aes128Gcm>(cek, iv, aad, ciphertext, tag),
            ContentEncryption::A192Gcm => gcm_open::<Aes192Gcm>(cek, iv, aad, ciphertext, tag),
            ContentEncryption::A256Gcm => gcm_open::<Aes256Gcm>(cek, iv, aad, ciphertext, tag),
            ContentEncryption::A128CbcHs256
            | ContentEncryption::A192CbcHs384
            | ContentEncryption::A256CbcHs512 => {
                let (mac_key, enc_key) = cek.split_at(cek.len() / 2);
                let expected = self.cbc_tag(mac_key, aad, iv, ciphertext)?;
                if !bool::from(expected.ct_eq(tag)) {
                    tracing::trace!(enc = self.name(), "content authentication tag mismatch");
                    return Err(CipherError::Decryption("authentication tag mismatch".into()));
                }
                cbc_decrypt(self, enc_key, iv, ciphertext)
            }
        }
    }

    fn check_lengths(self, cek: &[u8], iv: &[u8]) -> Result<()> {
        if cek.len() != self.cek_len() {
            return Err(CipherError::InvalidKeyLength {
                expected: self.cek_len(),
                actual: cek.len(),
            });
        }
        if iv.len() != self.iv_len() {
            return Err(CipherError::InvalidNonceLength {
                expected: self.iv_len(),
                actual: iv.len(),
            });
        }
        Ok(())
    }

    /// RFC 7518 §5.2.2.1: truncated HMAC over `AAD ‖ IV ‖ ciphertext ‖ AL`
    fn cbc_tag(self, mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let al = ((aad.len() as u64) * 8).to_be_bytes();
        macro_rules! tag_with {
            ($digest:ty) => {{
                let mut mac = <Hmac<$digest> as Mac>::new_from_slice(mac_key).map_err(|e| {
                    CipherError::Encryption(format!("HMAC key rejected: {e}"))
                })?;
                mac.update(aad);
                mac.update(iv);
                mac.update(ciphertext);
                mac.update(&al);
                mac.finalize().into_bytes()[..mac_key.len()].to_vec()
            }};
        }
        Ok(match self {
            ContentEncryption::A192CbcHs384 => tag_with!(Sha384),
            ContentEncryption::A256CbcHs512 => tag_with!(Sha512),
            _ => tag_with!(Sha256),
        })
    }
}

impl fmt::Display for ContentEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentEncryption {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self> {
        ContentEncryption::ALL
            .into_iter()
            .find(|enc| enc.name() == s)
            .ok_or_else(|| CipherError::UnsupportedAlgorithm(s.to_string()))
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

fn gcm_seal<C>(key: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>
where
    C: KeyInit + AeadInPlace,
{
    let cipher = C::new_from_slice(key).map_err(|e| CipherError::Encryption(e.to_string()))?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), aad, &mut buffer)
        .map_err(|e| CipherError::Encryption(e.to_string()))?;
    Ok((buffer, tag.to_vec()))
}

fn gcm_open<C>(key: &[u8], iv: &[u8], aad: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>>
where
    C: KeyInit + AeadInPlace,
{
    if tag.len() != GCM_TAG_LEN {
        return Err(CipherError::Decryption(format!(
            "authentication tag must be {GCM_TAG_LEN} bytes, got {}",
            tag.len()
        )));
    }
    let cipher = C::new_from_slice(key).map_err(|e| CipherError::Decryption(e.to_string()))?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(iv),
            aad,
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CipherError::Decryption("authentication tag mismatch".into()))?;
    Ok(buffer)
}

fn cbc_encrypt(enc: ContentEncryption, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let invalid = |e: aes::cipher::InvalidLength| CipherError::Encryption(e.to_string());
    Ok(match enc {
        ContentEncryption::A192CbcHs384 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        ContentEncryption::A256CbcHs512 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        _ => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
    })
}

fn cbc_decrypt(enc: ContentEncryption, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let invalid = |e: aes::cipher::InvalidLength| CipherError::Decryption(e.to_string());
    let unpad = |_| CipherError::Decryption("invalid padding".into());
    match enc {
        ContentEncryption::A192CbcHs384 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(unpad),
        ContentEncryption::A256CbcHs512 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(unpad),
        _ => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(unpad),
    }
}
