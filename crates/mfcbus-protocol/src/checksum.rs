//! Longitudinal (XOR) checksum.

use crate::constants::SYNC_BYTE;
use crate::error::ProtocolError;

/// XOR of every byte of `command` after its leading sync bytes.
///
/// Leading `0xFF` bytes are preamble, not protocol data, and are skipped. A
/// `0xFF` anywhere after the first non-sync byte is data and takes part.
pub fn checksum(command: &[u8]) -> u8 {
    command
        .iter()
        .skip_while(|&&b| b == SYNC_BYTE)
        .fold(0u8, |acc, &b| acc ^ b)
}

/// [`checksum`] over a command written as hex digit pairs, e.g. `"FFFF8280..."`.
pub fn checksum_hex(command: &str) -> Result<u8, ProtocolError> {
    Ok(checksum(&hex::decode(command)?))
}
