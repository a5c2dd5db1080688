//! Minimal script-number codec for token identifiers.
//!
//! Script numbers are little-endian with a sign bit in the most
//! significant bit of the last byte. Token identifiers are unsigned, so
//! encoding appends a zero byte whenever the top payload bit would read
//! as a sign, and decoding rejects negative or non-minimal forms outright.

use crate::ScriptError;

/// Widest identifier encoding accepted in a token script.
pub const MAX_IDENTIFIER_BYTES: usize = 8;

/// Encode an unsigned value as a minimal script number.
///
/// Fails if the encoding would exceed [`MAX_IDENTIFIER_BYTES`].
pub fn encode_scriptnum(value: u64) -> Result<Vec<u8>, ScriptError> {
    if value == 0 {
        // Zero never appears in a token script (identifiers start at 17),
        // but the codec still gives it its canonical empty encoding.
        return Ok(Vec::new());
    }

    let mut bytes = Vec::with_capacity(9);
    let mut v = value;
    while v > 0 {
        bytes.push((v & 0xff) as u8);
        v >>= 8;
    }
    if bytes[bytes.len() - 1] & 0x80 != 0 {
        bytes.push(0x00);
    }

    if bytes.len() > MAX_IDENTIFIER_BYTES {
        return Err(ScriptError::NumberTooBig(bytes.len()));
    }
    Ok(bytes)
}

/// Decode a minimal script number into an unsigned value.
///
/// Rejects encodings wider than [`MAX_IDENTIFIER_BYTES`], non-minimal
/// encodings, and values carrying the negative sign bit.
pub fn decode_scriptnum(bytes: &[u8]) -> Result<u64, ScriptError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > MAX_IDENTIFIER_BYTES {
        return Err(ScriptError::NumberTooBig(bytes.len()));
    }

    let last = bytes[bytes.len() - 1];
    if last & 0x7f == 0 {
        // A zero-valued final byte is only allowed when it exists to keep
        // the previous byte's high bit from reading as a sign.
        if last & 0x80 != 0 {
            return Err(ScriptError::NegativeNumber);
        }
        if bytes.len() == 1 || bytes[bytes.len() - 2] & 0x80 == 0 {
            return Err(ScriptError::NonMinimalNumber(hex::encode(bytes)));
        }
    }
    if last & 0x80 != 0 {
        return Err(ScriptError::NegativeNumber);
    }

    let mut value: u64 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        value |= (b as u64) << (8 * i);
    }
    Ok(value)
}
