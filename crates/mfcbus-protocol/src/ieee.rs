//! IEEE-754 single precision fields, big-endian.
//!
//! Floats travel as four bytes, most significant first. Short fields are
//! zero-padded on the right rather than rejected, which keeps a truncated
//! response readable.

use crate::constants::{IEEE_HEX_LEN, IEEE_LEN};
use crate::error::ProtocolError;

/// Encodes `value` as four big-endian bytes.
pub fn pack_bytes(value: f32) -> [u8; IEEE_LEN] {
    value.to_be_bytes()
}

/// Encodes `value` as eight lowercase hex digits.
pub fn pack(value: f32) -> String {
    hex::encode(pack_bytes(value))
}

/// Decodes up to four big-endian bytes, padding a short slice with zero bytes.
///
/// Bytes beyond the fourth are ignored.
pub fn unpack_bytes(bytes: &[u8]) -> f32 {
    let mut buf = [0u8; IEEE_LEN];
    let n = bytes.len().min(IEEE_LEN);
    buf[..n].copy_from_slice(&bytes[..n]);
    f32::from_be_bytes(buf)
}

/// Decodes eight hex digits, right-padding shorter input with `'0'`.
pub fn unpack(hex_str: &str) -> Result<f32, ProtocolError> {
    let mut digits = hex_str.to_string();
    while digits.len() < IEEE_HEX_LEN {
        digits.push('0');
    }
    let bytes = hex::decode(digits)?;
    Ok(unpack_bytes(&bytes))
}
