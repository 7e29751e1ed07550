//! Commands that can be sent to a device.

use crate::constants::*;
use crate::ieee;
use crate::types::*;

/// Commands supported by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Command #11: find the device owning a tag. Sent to the broadcast address.
    ReadUniqueIdByTag {
        /// Tag of the device to find.
        tag: Tag,
    },

    /// Command #1: read the primary variable (flow or pressure).
    ReadPrimaryVariable,

    /// Command #151: read gas density, reference conditions and flow range.
    ReadFlowRange {
        /// Gas selection code (1-6).
        gas_select: u8,
    },

    /// Command #235: read the setpoint.
    ReadSetpoint,

    /// Command #236: write the setpoint.
    WriteSetpoint {
        /// [`UNIT_PERCENT`] or [`UNIT_SELECTED`].
        unit: u8,
        /// Setpoint value in that unit.
        value: f32,
    },

    /// Command #196: select the flow unit and reference condition.
    SelectFlowUnit {
        /// Flow reference code.
        reference: u8,
        /// Flow unit code.
        unit: u8,
    },

    /// Command #240: read totalizer status.
    ReadTotalizerStatus,

    /// Command #242: read totalizer value.
    ReadTotalizerValue,

    /// Command #241: start, stop or reset the totalizer.
    ControlTotalizer {
        /// Requested action.
        command: TotalizerCommand,
    },
}

impl Command {
    /// Get the command code for this command.
    pub fn code(&self) -> u8 {
        match self {
            Command::ReadUniqueIdByTag { .. } => CMD_READ_UNIQUE_ID_BY_TAG,
            Command::ReadPrimaryVariable => CMD_READ_PRIMARY_VARIABLE,
            Command::ReadFlowRange { .. } => CMD_READ_FLOW_RANGE,
            Command::ReadSetpoint => CMD_READ_SETPOINT,
            Command::WriteSetpoint { .. } => CMD_WRITE_SETPOINT,
            Command::SelectFlowUnit { .. } => CMD_SELECT_FLOW_UNIT,
            Command::ReadTotalizerStatus => CMD_READ_TOTALIZER_STATUS,
            Command::ReadTotalizerValue => CMD_READ_TOTALIZER_VALUE,
            Command::ControlTotalizer { .. } => CMD_SET_TOTALIZER_CONTROL,
        }
    }

    /// Short name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ReadUniqueIdByTag { .. } => "read_unique_id_by_tag",
            Command::ReadPrimaryVariable => "read_primary_variable",
            Command::ReadFlowRange { .. } => "read_flow_range",
            Command::ReadSetpoint => "read_setpoint",
            Command::WriteSetpoint { .. } => "write_setpoint",
            Command::SelectFlowUnit { .. } => "select_flow_unit",
            Command::ReadTotalizerStatus => "read_totalizer_status",
            Command::ReadTotalizerValue => "read_totalizer_value",
            Command::ControlTotalizer { .. } => "control_totalizer",
        }
    }

    /// Request data following the byte count.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Command::ReadUniqueIdByTag { tag } => tag.packed().to_vec(),
            Command::ReadFlowRange { gas_select } => vec![*gas_select],
            Command::WriteSetpoint { unit, value } => {
                let mut buf = Vec::with_capacity(1 + IEEE_LEN);
                buf.push(*unit);
                buf.extend_from_slice(&ieee::pack_bytes(*value));
                buf
            }
            Command::SelectFlowUnit { reference, unit } => vec![*reference, *unit],
            Command::ControlTotalizer { command } => vec![u8::from(*command)],
            Command::ReadPrimaryVariable
            | Command::ReadSetpoint
            | Command::ReadTotalizerStatus
            | Command::ReadTotalizerValue => Vec::new(),
        }
    }

    /// Encode the command body for `address`: delimiter, address, code, byte
    /// count, payload. Preamble and checksum are added by the frame codec.
    pub fn encode(&self, address: &[u8; LONG_ADDRESS_LEN]) -> Vec<u8> {
        let payload = self.payload();
        let mut buf = Vec::with_capacity(1 + LONG_ADDRESS_LEN + 2 + payload.len());
        buf.push(DELIMITER_MASTER_LONG);
        buf.extend_from_slice(address);
        buf.push(self.code());
        buf.push(payload.len() as u8);
        buf.extend_from_slice(&payload);
        buf
    }
}
