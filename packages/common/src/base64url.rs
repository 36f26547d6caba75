//! Base64url codec (RFC 7515 §2)
//!
//! Encoding is URL-safe without padding. Segment decoding is strict apart from
//! optional `=` padding, so every byte string has exactly one accepted
//! spelling. [`decode_lenient`] is for base64 key text only.

use crate::error::Result;
use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::URL_SAFE_NO_PAD},
};

const SEGMENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Base64 URL-safe encoding without padding
#[inline]
#[must_use]
pub fn encode(input: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Decode a compact token segment
///
/// URL-safe alphabet only, `=` padding optional, unused trailing bits must
/// be zero.
///
/// # Errors
///
/// Returns `DecodeError` for any other input, including whitespace and the
/// standard alphabet's `+` / `/`.
pub fn decode(input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    Ok(SEGMENT.decode(input)?)
}

/// Tolerant base64 / base64url decoding for key text
///
/// Accepts either alphabet, with or without padding, ignoring ASCII
/// whitespace.
///
/// # Errors
///
/// Returns `DecodeError` when the input contains characters outside both
/// alphabets or has an impossible length.
pub fn decode_lenient(input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    let normalized: Vec<u8> = input
        .as_ref()
        .iter()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|&b| match b {
            b'+' => b'-',
            b'/' => b'_',
            other => other,
        })
        .collect();
    Ok(LENIENT.decode(normalized)?)
}
