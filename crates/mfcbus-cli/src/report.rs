//! Device actions and their printable results.

use std::fmt;

use mfcbus_protocol::*;
use serde::Serialize;

use crate::error::{CliError, CliResult};

/// Largest difference between a requested and an echoed setpoint that still
/// counts as accepted.
pub const SETPOINT_TOLERANCE: f32 = 1e-5;

/// A single-device operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Report what discovery found.
    Discover,
    /// Read the primary variable.
    ReadPrimaryVariable,
    /// Read density, reference conditions and flow range.
    ReadFlowRange {
        /// Gas selection code.
        gas_select: u8,
    },
    /// Read the setpoint.
    ReadSetpoint,
    /// Write the setpoint.
    WriteSetpoint {
        /// Requested value.
        value: f32,
        /// [`UNIT_PERCENT`] or [`UNIT_SELECTED`].
        unit: u8,
    },
    /// Select the flow unit.
    SelectFlowUnit {
        /// Unit code.
        unit: u8,
        /// Flow reference code.
        reference: u8,
    },
    /// Read the totalizer status.
    TotalizerStatus,
    /// Read the totalizer count.
    TotalizerValue,
    /// Start, stop or reset the totalizer.
    ControlTotalizer(TotalizerCommand),
}

/// Result of an [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    /// Discovery result.
    Identity {
        /// Tag used for discovery.
        tag: String,
        /// Long address as hex.
        long_address: String,
        /// Manufacturer identification code.
        manufacturer_code: u8,
        /// Device type code.
        device_type: u8,
    },
    /// Primary variable.
    PrimaryVariable(PrimaryVariable),
    /// Flow range record.
    FlowRange(FlowRange),
    /// Setpoint record.
    Setpoint(Setpoint),
    /// Setpoint write result.
    SetpointWritten {
        /// Value sent.
        requested: f32,
        /// Setpoint echoed by the device.
        setpoint: Setpoint,
        /// Whether the echo matches the request.
        accepted: bool,
    },
    /// Flow unit selection result.
    UnitSelected {
        /// Unit code sent.
        unit: u8,
        /// Reference code sent.
        reference: u8,
        /// Whether the device echoed both.
        confirmed: bool,
    },
    /// Totalizer status.
    TotalizerState(TotalizerState),
    /// Totalizer count.
    TotalizerValue(TotalizerValue),
    /// Totalizer status after a control command.
    TotalizerControl {
        /// Resulting status.
        status: TotalizerStatus,
    },
}

/// Display label of a unit code: its name, or `unit <code>` when unknown.
pub fn unit_label(code: u8) -> String {
    unit_name(code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("unit {code}"))
}

/// Parse a unit given by name (`l/min`, `%`, ...) or by numeric code.
pub fn parse_unit(text: &str) -> CliResult<u8> {
    unit_code(text)
        .or_else(|| text.trim().parse().ok())
        .ok_or_else(|| CliError::UnknownUnit(text.to_string()))
}

/// Run `action` against `device` using the strict API.
pub fn execute<C: ByteChannel>(device: &mut DeviceSession<C>, action: Action) -> CliResult<Report> {
    let report = match action {
        Action::Discover => {
            let identity = *device.identity();
            Report::Identity {
                tag: device.tag().to_string(),
                long_address: device.long_address().to_hex(),
                manufacturer_code: identity.manufacturer_code,
                device_type: identity.device_type,
            }
        }
        Action::ReadPrimaryVariable => Report::PrimaryVariable(device.try_read_primary_variable()?),
        Action::ReadFlowRange { gas_select } => {
            Report::FlowRange(device.try_read_flow_range(gas_select)?)
        }
        Action::ReadSetpoint => Report::Setpoint(device.try_read_setpoint()?),
        Action::WriteSetpoint { value, unit } => {
            let setpoint = device.try_write_setpoint(value, unit)?;
            let echoed = if unit == UNIT_PERCENT {
                setpoint.percent
            } else {
                setpoint.value
            };
            Report::SetpointWritten {
                requested: value,
                setpoint,
                accepted: (echoed - value).abs() <= SETPOINT_TOLERANCE,
            }
        }
        Action::SelectFlowUnit { unit, reference } => Report::UnitSelected {
            unit,
            reference,
            confirmed: device.try_select_flow_unit(unit, reference)?,
        },
        Action::TotalizerStatus => Report::TotalizerState(device.try_read_totalizer_status()?),
        Action::TotalizerValue => Report::TotalizerValue(device.try_read_totalizer_value()?),
        Action::ControlTotalizer(command) => Report::TotalizerControl {
            status: device.try_control_totalizer(command)?,
        },
    };
    Ok(report)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Identity {
                tag,
                long_address,
                manufacturer_code,
                device_type,
            } => write!(
                f,
                "tag {tag}: long address {long_address} (manufacturer {manufacturer_code:#04x}, type {device_type:#04x})"
            ),
            Report::PrimaryVariable(pv) => {
                write!(f, "flow {:.3} {}", pv.value, unit_label(pv.unit))
            }
            Report::FlowRange(range) => write!(
                f,
                "gas {}: full scale {:.3} {}, density {:.4}, reference {:.2} / {:.3}",
                range.gas_select,
                range.flow_range,
                unit_label(range.flow_unit),
                range.density,
                range.reference_temperature,
                range.reference_pressure
            ),
            Report::Setpoint(sp) => write!(
                f,
                "setpoint {:.3} {} ({:.2} %)",
                sp.value,
                unit_label(sp.unit),
                sp.percent
            ),
            Report::SetpointWritten {
                requested,
                setpoint,
                accepted,
            } => write!(
                f,
                "setpoint {:.3} {} ({:.2} %), requested {:.3}: {}",
                setpoint.value,
                unit_label(setpoint.unit),
                setpoint.percent,
                requested,
                if *accepted { "accepted" } else { "NOT accepted" }
            ),
            Report::UnitSelected {
                unit,
                reference,
                confirmed,
            } => write!(
                f,
                "unit {} (reference {}): {}",
                unit_label(*unit),
                reference,
                if *confirmed { "confirmed" } else { "NOT confirmed" }
            ),
            Report::TotalizerState(state) => {
                write!(f, "totalizer {} ({})", state.status, unit_label(state.unit))
            }
            Report::TotalizerValue(total) => {
                write!(f, "totalizer {:.3} {}", total.count, unit_label(total.unit))
            }
            Report::TotalizerControl { status } => write!(f, "totalizer {status}"),
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

/// One polling cycle's reading of a device: full scale, setpoint and flow.
///
/// Readings that fail are reported as `-1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Device name.
    pub name: String,
    /// Device tag.
    pub tag: String,
    /// Flow at 100 % for gas 1.
    pub full_scale: f32,
    /// Setpoint in the selected unit.
    pub setpoint: f32,
    /// Label of the selected unit.
    pub unit: String,
    /// Measured flow.
    pub flow: f32,
}

impl Snapshot {
    /// Read a snapshot from `device` with the sentinel API.
    pub fn read<C: ByteChannel>(name: &str, device: &mut DeviceSession<C>) -> Self {
        let (full_scale, _) = device.read_flow_range(GAS_SELECT_MIN);
        let (setpoint, unit) = device.read_setpoint();
        let flow = device.read_primary_variable();
        Snapshot {
            name: name.to_string(),
            tag: device.tag().to_string(),
            full_scale,
            setpoint,
            unit: unit_label(unit),
            flow,
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<12} {}  fs {:>10.3}  sp {:>10.3}  pv {:>10.3}  {}",
            self.name, self.tag, self.full_scale, self.setpoint, self.flow, self.unit
        )
    }
}
