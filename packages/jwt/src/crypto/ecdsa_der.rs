//! ECDSA signature codec between ASN.1 DER and the fixed-width JWS form
//!
//! DER: `SEQUENCE { INTEGER r, INTEGER s }`. JWS (RFC 7518 §3.4): `r ‖ s`,
//! each left-padded to the curve's component size (32, 48 or 66 bytes).

use thiserror::Error;

const SEQUENCE: u8 = 0x30;
const INTEGER: u8 = 0x02;
const LONG_FORM_1: u8 = 0x81;

/// Signature codec failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureCodecError {
    /// DER structure did not match `SEQUENCE { INTEGER, INTEGER }`
    #[error("Could not extract parameters from DER signature")]
    MalformedDer,
    /// Fixed-width input of the wrong length
    #[error("Signature must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// `2 * size`
        expected: usize,
        /// Input length
        actual: usize,
    },
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, SignatureCodecError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(SignatureCodecError::MalformedDer)?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SignatureCodecError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(SignatureCodecError::MalformedDer)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(SignatureCodecError::MalformedDer)?;
        self.pos = end;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn integer(&mut self, size: usize) -> Result<&'a [u8], SignatureCodecError> {
        if self.byte()? != INTEGER {
            return Err(SignatureCodecError::MalformedDer);
        }
        let len = usize::from(self.byte()?);
        if len == 0 || len > size + 1 {
            return Err(SignatureCodecError::MalformedDer);
        }
        let value = self.take(len)?;
        if len == size + 1 {
            // only a sign byte may push the integer past the component size
            return match value.split_first() {
                Some((0, rest)) => Ok(rest),
                _ => Err(SignatureCodecError::MalformedDer),
            };
        }
        Ok(value)
    }
}

/// Convert a DER ECDSA signature into `r ‖ s` of `2 * size` bytes
///
/// # Errors
///
/// Returns [`SignatureCodecError::MalformedDer`] on any structural mismatch.
pub fn der_to_concat(signature: &[u8], size: usize) -> Result<Vec<u8>, SignatureCodecError> {
    let mut reader = Reader {
        bytes: signature,
        pos: 0,
    };
    if reader.byte()? != SEQUENCE {
        return Err(SignatureCodecError::MalformedDer);
    }
    let mut seq_len = usize::from(reader.byte()?);
    if seq_len == usize::from(LONG_FORM_1) {
        seq_len = usize::from(reader.byte()?);
    } else if seq_len > 0x7f {
        return Err(SignatureCodecError::MalformedDer);
    }
    if seq_len != reader.remaining() {
        return Err(SignatureCodecError::MalformedDer);
    }

    let r = reader.integer(size)?;
    let s = reader.integer(size)?;
    if reader.remaining() != 0 {
        return Err(SignatureCodecError::MalformedDer);
    }

    let mut out = vec![0u8; 2 * size];
    out[size - r.len()..size].copy_from_slice(r);
    out[2 * size - s.len()..].copy_from_slice(s);
    Ok(out)
}

/// Minimal DER INTEGER content for an unsigned big-endian component
fn integer_content(component: &[u8]) -> Vec<u8> {
    let start = component
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(component.len());
    let trimmed = &component[start..];
    match trimmed.first() {
        None => vec![0],
        Some(&b) if b >= 0x80 => {
            let mut content = Vec::with_capacity(trimmed.len() + 1);
            content.push(0);
            content.extend_from_slice(trimmed);
            content
        }
        Some(_) => trimmed.to_vec(),
    }
}

/// Convert `r ‖ s` of `2 * size` bytes into a DER ECDSA signature
///
/// # Errors
///
/// Returns [`SignatureCodecError::InvalidLength`] when the input is not
/// exactly `2 * size` bytes.
pub fn concat_to_der(signature: &[u8], size: usize) -> Result<Vec<u8>, SignatureCodecError> {
    if signature.len() != 2 * size {
        return Err(SignatureCodecError::InvalidLength {
            expected: 2 * size,
            actual: signature.len(),
        });
    }
    let (r, s) = signature.split_at(size);
    let r = integer_content(r);
    let s = integer_content(s);

    let content_len = r.len() + s.len() + 4;
    let mut der = Vec::with_capacity(content_len + 3);
    der.push(SEQUENCE);
    if content_len < 0x80 {
        der.push(content_len as u8);
    } else {
        // r and s are at most 67 bytes each, so one length byte suffices
        der.push(LONG_FORM_1);
        der.push(content_len as u8);
    }
    for int in [&r, &s] {
        der.push(INTEGER);
        der.push(int.len() as u8);
        der.extend_from_slice(int);
    }
    Ok(der)
}
