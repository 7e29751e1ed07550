//! Poller configuration file.
//!
//! ```yaml
//! serial:
//!   port: /dev/ttyUSB0
//!   timeout_ms: 500
//! transport:
//!   settle_ms: 200
//!   max_attempts: 9
//! devices:
//!   - name: n2
//!     tag: "28478010"
//! ```
//!
//! Every section is optional; command-line flags override the file.

use std::path::Path;

use mfcbus_protocol::{Tag, TransportConfig, BAUD_RATE};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Serial line settings. Parity, data and stop bits are fixed at 8O1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM2`.
    pub port: Option<String>,
    /// Line speed.
    pub baud_rate: u32,
    /// Read/write timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings {
            port: None,
            baud_rate: BAUD_RATE,
            timeout_ms: 1000,
        }
    }
}

/// A device on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Display name.
    pub name: String,
    /// Device tag used for discovery.
    pub tag: Tag,
}

/// Complete poller configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Serial line settings.
    pub serial: SerialSettings,
    /// Retry loop settings.
    pub transport: TransportConfig,
    /// Devices to poll.
    pub devices: Vec<DeviceConfig>,
}

impl PollerConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(text: &str) -> CliResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a YAML file.
    pub fn load(path: impl AsRef<Path>) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Device named `name`.
    pub fn device(&self, name: &str) -> CliResult<&DeviceConfig> {
        self.devices
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| CliError::UnknownDevice(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PollerConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.serial.baud_rate, 19_200);
        assert_eq!(config.serial.port, None);
        assert_eq!(config.transport, TransportConfig::default());
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
serial:
  port: COM2
transport:
  settle_ms: 50
devices:
  - name: n2
    tag: "28478010"
  - name: ar
    tag: "MFC-12345678"
"#;
        let config = PollerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("COM2"));
        assert_eq!(config.serial.timeout_ms, 1000);
        assert_eq!(config.transport.settle_ms, 50);
        assert_eq!(config.transport.max_attempts, 9);
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.device("ar").unwrap().tag.as_str(), "12345678");
        assert!(matches!(config.device("o2"), Err(CliError::UnknownDevice(_))));
    }

    #[test]
    fn test_short_tag_is_rejected() {
        let yaml = "devices:\n  - name: n2\n    tag: \"1234\"\n";
        assert!(matches!(
            PollerConfig::from_yaml_str(yaml),
            Err(CliError::Config(_))
        ));
    }
}
