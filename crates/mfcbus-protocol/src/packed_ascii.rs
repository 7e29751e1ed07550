//! Packed-ASCII (6-bit ASCII) encoding.
//!
//! Each character is reduced to six bits and the bit stream is re-cut into bytes,
//! so eight characters fit in six bytes:
//!
//! ```text
//! c0       c1       c2       c3       c4       c5       c6       c7
//! 000000 111111 222222 333333 444444 555555 666666 777777
//! |  byte 0  |  byte 1  |  byte 2  |  byte 3  |  byte 4  |  byte 5  |
//! ```

use crate::constants::{PACKED_TAG_LEN, TAG_LEN};

/// Six-bit code of a character: `(code point mod 128) mod 64`.
///
/// No validation is done; lower-case letters and other characters outside the
/// packed-ASCII table fold onto it.
pub fn six_bit(c: char) -> u8 {
    ((c as u32 % 128) % 64) as u8
}

/// Packs the last eight characters of `text` into six bytes.
///
/// Missing characters (text shorter than eight) contribute zero bits at the end.
pub fn pack(text: &str) -> [u8; PACKED_TAG_LEN] {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.len().saturating_sub(TAG_LEN);

    let mut bits: u64 = 0;
    for slot in 0..TAG_LEN {
        let code = chars.get(start + slot).map_or(0, |&c| six_bit(c));
        bits = (bits << 6) | u64::from(code);
    }

    let mut packed = [0u8; PACKED_TAG_LEN];
    packed.copy_from_slice(&bits.to_be_bytes()[8 - PACKED_TAG_LEN..]);
    packed
}

/// Packs `text` and renders it as 12 lowercase hex digits.
pub fn pack_hex(text: &str) -> String {
    hex::encode(pack(text))
}

/// Reverses [`pack`] into the eight six-bit codes, rendered in the packed-ASCII
/// character set (`@`, `A`-`Z`, ... for 0-31, space through `?` for 32-63).
pub fn unpack(packed: &[u8; PACKED_TAG_LEN]) -> String {
    let mut buf = [0u8; 8];
    buf[8 - PACKED_TAG_LEN..].copy_from_slice(packed);
    let bits = u64::from_be_bytes(buf);

    (0..TAG_LEN)
        .rev()
        .map(|slot| {
            let code = ((bits >> (slot * 6)) & 0x3F) as u8;
            let ascii = if code < 32 { code + 64 } else { code };
            ascii as char
        })
        .collect()
}
