//! CLI error types.

use mfcbus_protocol::ProtocolError;
use thiserror::Error;

/// Errors reported by the `mfcbus` binary.
#[derive(Error, Debug)]
pub enum CliError {
    /// Protocol or device error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Configuration file is not valid YAML for [`PollerConfig`](crate::PollerConfig).
    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    /// JSON output could not be produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Metrics exporter could not be installed.
    #[error("metrics error: {0}")]
    Metrics(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No serial port given on the command line or in the config file.
    #[error("no serial port configured (use --port or a config file)")]
    NoPort,

    /// No device selected for a single-device command.
    #[error("no device selected (use --tag, --device or a config file)")]
    NoDevice,

    /// `--device` names a device missing from the config file.
    #[error("unknown device {0:?}")]
    UnknownDevice(String),

    /// A unit name or code that cannot be sent.
    #[error("unknown unit {0:?} (expected l/min, ml/min, cc/min, %, selected or a code 0-255)")]
    UnknownUnit(String),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
