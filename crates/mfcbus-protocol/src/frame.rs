//! Frame encoding/decoding.
//!
//! Outbound frames carry a sync preamble, the command body, an XOR checksum and
//! a terminator:
//!
//! ```text
//! +----+----+----+----+-----------------+-----+----+
//! | FF | FF | FF | FF | command body    | chk | 00 |
//! +----+----+----+----+-----------------+-----+----+
//! ```
//!
//! Inbound bytes are de-framed after every `0xFF` has been dropped:
//!
//! ```text
//! +-------+-------------+-----+-------+--------+-------------------+
//! | delim | address (5) | cmd | count | status | data[count - 2]   |
//! +-------+-------------+-----+-------+--------+-------------------+
//! ```
//!
//! Sync bytes are dropped wherever they appear, not only in the preamble, so a
//! payload byte equal to `0xFF` is lost too. Devices on the bus depend on this
//! behaviour being reproduced; readings whose encoding contains `0xFF` come
//! back shifted.

use bytes::{Buf, Bytes, BytesMut};

use crate::checksum::checksum;
use crate::constants::*;
use crate::error::ProtocolError;

/// A de-framed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResponse {
    /// Start delimiter, not interpreted.
    pub delimiter: u8,
    /// Echoed address, not interpreted.
    pub address: [u8; LONG_ADDRESS_LEN],
    /// Echoed command code.
    pub command: u8,
    /// Byte count: status plus data.
    pub byte_count: u8,
    /// Response and device status bytes.
    pub status: [u8; STATUS_LEN],
    /// Command-specific data.
    pub data: Bytes,
}

/// A codec for writing command frames and reading responses.
///
/// Incoming bytes are accumulated with [`FrameCodec::push`], which discards sync
/// bytes as they arrive; [`FrameCodec::decode`] then parses the accumulated bytes.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Received bytes with sync bytes removed.
    buffer: BytesMut,
}

impl FrameCodec {
    /// Create a new frame codec.
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(64),
        }
    }

    /// Add received data to the buffer, dropping every sync byte.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer
            .extend(data.iter().copied().filter(|&b| b != SYNC_BYTE));
    }

    /// Decode the buffered bytes into a response.
    ///
    /// The buffer is consumed whether or not decoding succeeds. Bytes after the
    /// payload (the device's checksum) are ignored.
    pub fn decode(&mut self) -> Result<DecodedResponse, ProtocolError> {
        let mut buffer = self.buffer.split();

        if buffer.len() < RESPONSE_HEADER_LEN {
            return Err(ProtocolError::FrameTooShort {
                expected: RESPONSE_HEADER_LEN,
                actual: buffer.len(),
            });
        }

        let delimiter = buffer[0];
        let mut address = [0u8; LONG_ADDRESS_LEN];
        address.copy_from_slice(&buffer[1..1 + LONG_ADDRESS_LEN]);
        let command = buffer[6];
        let byte_count = buffer[7];

        buffer.advance(RESPONSE_HEADER_LEN);
        if buffer.len() < usize::from(byte_count) {
            return Err(ProtocolError::Truncated {
                byte_count: usize::from(byte_count),
                available: buffer.len(),
            });
        }

        // A byte count below two carries a partial status and no data.
        let mut payload = buffer.split_to(usize::from(byte_count));
        let mut status = [0u8; STATUS_LEN];
        let status_len = payload.len().min(STATUS_LEN);
        status[..status_len].copy_from_slice(&payload[..status_len]);
        payload.advance(status_len);

        Ok(DecodedResponse {
            delimiter,
            address,
            command,
            byte_count,
            status,
            data: payload.freeze(),
        })
    }

    /// Decode a complete read in one step.
    pub fn decode_bytes(raw: &[u8]) -> Result<DecodedResponse, ProtocolError> {
        let mut codec = FrameCodec::new();
        codec.push(raw);
        codec.decode()
    }

    /// Encode a command body into a frame: preamble, body, checksum, terminator.
    pub fn encode(command: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PREAMBLE_LEN + command.len() + 2);
        buf.extend_from_slice(&[SYNC_BYTE; PREAMBLE_LEN]);
        buf.extend_from_slice(command);
        buf.push(checksum(command));
        buf.push(FRAME_TERMINATOR);
        buf
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
