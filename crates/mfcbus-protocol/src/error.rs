//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when talking S-Protocol to a device.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Response is too short to hold a header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length after sync bytes were stripped.
        actual: usize,
    },

    /// Byte count reaches past the bytes actually received.
    #[error("truncated payload: byte count {byte_count}, {available} bytes available")]
    Truncated {
        /// Byte count announced in the header.
        byte_count: usize,
        /// Bytes available after the header.
        available: usize,
    },

    /// Every attempt of an exchange failed to decode.
    #[error("no valid response after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Decode error of the final attempt.
        last: Box<ProtocolError>,
    },

    /// A field is missing from a response payload.
    #[error("missing field {field}: need {len} byte(s) at offset {offset}, payload has {available}")]
    MissingField {
        /// Field name.
        field: &'static str,
        /// Offset of the field within the data.
        offset: usize,
        /// Field length in bytes.
        len: usize,
        /// Data length.
        available: usize,
    },

    /// Text that should be hexadecimal is not.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Tag does not have enough characters.
    #[error("invalid tag {0:?}: need at least 8 characters")]
    InvalidTag(String),

    /// Argument outside the range the device accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Discovery handshake failed; the session cannot be used.
    #[error("discovery failed: {0}")]
    Discovery(Box<ProtocolError>),

    /// Byte channel I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the frame decoder produced this error.
    ///
    /// Decode errors are retried by the transport; everything else is returned
    /// to the caller as is.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::FrameTooShort { .. }
                | ProtocolError::Truncated { .. }
        )
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
