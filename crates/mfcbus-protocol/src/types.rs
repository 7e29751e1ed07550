//! Common types used in the protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ProtocolError;
use crate::packed_ascii;

/// An eight-character device tag.
///
/// Longer input keeps only its last eight characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Builds a tag from the last eight characters of `text`.
    pub fn new(text: &str) -> Result<Self, ProtocolError> {
        let count = text.chars().count();
        if count < TAG_LEN {
            return Err(ProtocolError::InvalidTag(text.to_string()));
        }
        Ok(Tag(text.chars().skip(count - TAG_LEN).collect()))
    }

    /// The tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Packed-ASCII form sent in the discovery command.
    pub fn packed(&self) -> [u8; PACKED_TAG_LEN] {
        packed_ascii::pack(&self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Tag {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::new(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tag::new(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

/// A device's 5-byte long address, fixed once discovery succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LongAddress(pub [u8; LONG_ADDRESS_LEN]);

impl LongAddress {
    /// Assembles the address from the discovery response fields.
    pub fn new(manufacturer_code: u8, device_type: u8, device_id: [u8; 3]) -> Self {
        LongAddress([
            manufacturer_code,
            device_type,
            device_id[0],
            device_id[1],
            device_id[2],
        ])
    }

    /// Manufacturer identification code.
    pub fn manufacturer_code(&self) -> u8 {
        self.0[0]
    }

    /// Manufacturer device type code.
    pub fn device_type(&self) -> u8 {
        self.0[1]
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; LONG_ADDRESS_LEN] {
        &self.0
    }

    /// Get the bytes as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for LongAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Commands accepted by the totalizer (command #241).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalizerCommand {
    /// Stop counting.
    Stop,
    /// Start counting.
    Start,
    /// Reset the count; the running state is unchanged.
    Reset,
}

impl From<TotalizerCommand> for u8 {
    fn from(command: TotalizerCommand) -> Self {
        match command {
            TotalizerCommand::Stop => 0,
            TotalizerCommand::Start => 1,
            TotalizerCommand::Reset => 2,
        }
    }
}

impl TryFrom<u8> for TotalizerCommand {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TotalizerCommand::Stop),
            1 => Ok(TotalizerCommand::Start),
            2 => Ok(TotalizerCommand::Reset),
            other => Err(ProtocolError::InvalidArgument(format!(
                "totalizer command code {other} (expected 0, 1 or 2)"
            ))),
        }
    }
}

/// Totalizer state reported by commands #240 and #241.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalizerStatus {
    /// Stopped.
    Stopped,
    /// Running.
    Running,
    /// Resetting.
    Resetting,
    /// A code outside the documented set.
    Unknown(u8),
}

impl TotalizerStatus {
    /// Raw status code.
    pub fn code(&self) -> u8 {
        match self {
            TotalizerStatus::Stopped => 0,
            TotalizerStatus::Running => 1,
            TotalizerStatus::Resetting => 2,
            TotalizerStatus::Unknown(code) => *code,
        }
    }
}

impl From<u8> for TotalizerStatus {
    fn from(code: u8) -> Self {
        match code {
            0 => TotalizerStatus::Stopped,
            1 => TotalizerStatus::Running,
            2 => TotalizerStatus::Resetting,
            other => TotalizerStatus::Unknown(other),
        }
    }
}

impl fmt::Display for TotalizerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalizerStatus::Stopped => write!(f, "stopped"),
            TotalizerStatus::Running => write!(f, "running"),
            TotalizerStatus::Resetting => write!(f, "resetting"),
            TotalizerStatus::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// Display name of a unit code, if it is one the driver knows.
pub fn unit_name(code: u8) -> Option<&'static str> {
    match code {
        UNIT_LITERS_PER_MINUTE => Some("l/min"),
        UNIT_PERCENT => Some("%"),
        UNIT_MILLILITERS_PER_MINUTE => Some("ml/min"),
        UNIT_CUBIC_CM_PER_MINUTE => Some("cc/min"),
        UNIT_SELECTED => Some("selected"),
        _ => None,
    }
}

/// Unit code for a display name accepted by [`unit_name`].
pub fn unit_code(name: &str) -> Option<u8> {
    match name.trim() {
        "l/min" => Some(UNIT_LITERS_PER_MINUTE),
        "%" => Some(UNIT_PERCENT),
        "ml/min" => Some(UNIT_MILLILITERS_PER_MINUTE),
        "cc/min" => Some(UNIT_CUBIC_CM_PER_MINUTE),
        "selected" => Some(UNIT_SELECTED),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_keeps_last_eight_characters() {
        let tag = Tag::new("MFC-28478010").unwrap();
        assert_eq!(tag.as_str(), "28478010");
        assert_eq!(tag.packed(), packed_ascii::pack("28478010"));
    }

    #[test]
    fn test_tag_rejects_short_input() {
        assert!(matches!(Tag::new("1234567"), Err(ProtocolError::InvalidTag(_))));
    }

    #[test]
    fn test_tag_string_conversions() {
        let tag = Tag::try_from("28478010".to_string()).unwrap();
        assert_eq!(tag.to_string(), "28478010");
        assert_eq!(String::from(tag), "28478010");
        assert!("123".parse::<Tag>().is_err());
    }

    #[test]
    fn test_long_address_fields() {
        let address = LongAddress::new(0x0A, 0x3B, [0x12, 0x34, 0x56]);
        assert_eq!(address.manufacturer_code(), 0x0A);
        assert_eq!(address.device_type(), 0x3B);
        assert_eq!(address.to_hex(), "0a3b123456");
    }

    #[test]
    fn test_totalizer_command_codes() {
        assert_eq!(u8::from(TotalizerCommand::Reset), 2);
        assert_eq!(TotalizerCommand::try_from(1).unwrap(), TotalizerCommand::Start);
        assert!(TotalizerCommand::try_from(3).is_err());
    }

    #[test]
    fn test_totalizer_status_round_trip() {
        for code in 0..=3u8 {
            assert_eq!(TotalizerStatus::from(code).code(), code);
        }
        assert_eq!(TotalizerStatus::from(7), TotalizerStatus::Unknown(7));
    }

    #[test]
    fn test_unit_names() {
        assert_eq!(unit_name(171), Some("ml/min"));
        assert_eq!(unit_code(" l/min"), Some(17));
        assert_eq!(unit_name(3), None);
    }
}
