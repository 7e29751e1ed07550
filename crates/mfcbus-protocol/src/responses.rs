//! Per-command response decoders.
//!
//! Each decoder reads the `data` of a [`DecodedResponse`](crate::DecodedResponse)
//! (status bytes already removed) at the fixed offsets of its command. Unit and
//! status bytes must be present; float fields shorter than four bytes are
//! zero-padded, so a truncated float decodes to a nearby value instead of failing.

use serde::Serialize;

use crate::constants::IEEE_LEN;
use crate::error::ProtocolError;
use crate::ieee;
use crate::types::*;

/// Identity returned by command #11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    /// Manufacturer identification code.
    pub manufacturer_code: u8,
    /// Manufacturer device type code.
    pub device_type: u8,
    /// Device identification number (last three data bytes).
    pub device_id: [u8; 3],
}

impl DeviceIdentity {
    /// The long address used for every later command.
    pub fn long_address(&self) -> LongAddress {
        LongAddress::new(self.manufacturer_code, self.device_type, self.device_id)
    }
}

/// Primary variable from command #1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrimaryVariable {
    /// Unit code.
    pub unit: u8,
    /// Flow or pressure, depending on the device.
    pub value: f32,
}

/// Gas density, reference conditions and flow range from command #151.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowRange {
    /// Gas selection code echoed by the device.
    pub gas_select: u8,
    /// Density unit code.
    pub density_unit: u8,
    /// Process gas density.
    pub density: f32,
    /// Reference temperature unit code.
    pub reference_temperature_unit: u8,
    /// Reference temperature.
    pub reference_temperature: f32,
    /// Reference pressure unit code.
    pub reference_pressure_unit: u8,
    /// Reference pressure.
    pub reference_pressure: f32,
    /// Flow unit code of the range.
    pub flow_unit: u8,
    /// Flow at 100 % as calibrated.
    pub flow_range: f32,
}

/// Setpoint from commands #235 and #236.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Setpoint {
    /// Unit code of `percent`, always percent.
    pub percent_unit: u8,
    /// Setpoint in percent of full scale.
    pub percent: f32,
    /// Selected unit code.
    pub unit: u8,
    /// Setpoint in the selected unit.
    pub value: f32,
}

/// Totalizer status from command #240.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalizerState {
    /// Running state.
    pub status: TotalizerStatus,
    /// Totalizer unit code.
    pub unit: u8,
}

/// Totalizer count from command #242.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TotalizerValue {
    /// Totalizer unit code.
    pub unit: u8,
    /// Accumulated count.
    pub count: f32,
}

fn byte_at(data: &[u8], offset: usize, field: &'static str) -> Result<u8, ProtocolError> {
    data.get(offset)
        .copied()
        .ok_or(ProtocolError::MissingField {
            field,
            offset,
            len: 1,
            available: data.len(),
        })
}

fn float_at(data: &[u8], offset: usize) -> f32 {
    let end = data.len().min(offset + IEEE_LEN);
    ieee::unpack_bytes(data.get(offset..end).unwrap_or(&[]))
}

/// Command #11. Layout: `[1]` manufacturer, `[2]` device type, last three bytes
/// device id.
pub fn decode_identity(data: &[u8]) -> Result<DeviceIdentity, ProtocolError> {
    let manufacturer_code = byte_at(data, 1, "manufacturer_code")?;
    let device_type = byte_at(data, 2, "device_type")?;
    let tail = &data[data.len() - 3..];
    Ok(DeviceIdentity {
        manufacturer_code,
        device_type,
        device_id: [tail[0], tail[1], tail[2]],
    })
}

/// Command #1. Layout: `[0]` unit, `[1..5]` value.
pub fn decode_primary_variable(data: &[u8]) -> Result<PrimaryVariable, ProtocolError> {
    Ok(PrimaryVariable {
        unit: byte_at(data, 0, "unit")?,
        value: float_at(data, 1),
    })
}

/// Command #151. Layout: `[0]` gas, `[1]` density unit, `[2..6]` density,
/// `[6]` temperature unit, `[7..11]` temperature, `[11]` pressure unit,
/// `[12..16]` pressure, `[16]` flow unit, `[17..21]` flow range.
pub fn decode_flow_range(data: &[u8]) -> Result<FlowRange, ProtocolError> {
    Ok(FlowRange {
        gas_select: byte_at(data, 0, "gas_select")?,
        density_unit: byte_at(data, 1, "density_unit")?,
        density: float_at(data, 2),
        reference_temperature_unit: byte_at(data, 6, "reference_temperature_unit")?,
        reference_temperature: float_at(data, 7),
        reference_pressure_unit: byte_at(data, 11, "reference_pressure_unit")?,
        reference_pressure: float_at(data, 12),
        flow_unit: byte_at(data, 16, "flow_unit")?,
        flow_range: float_at(data, 17),
    })
}

/// Commands #235 and #236. Layout: `[0]` percent unit, `[1..5]` percent,
/// `[5]` selected unit, `[6..10]` value.
pub fn decode_setpoint(data: &[u8]) -> Result<Setpoint, ProtocolError> {
    Ok(Setpoint {
        percent_unit: byte_at(data, 0, "percent_unit")?,
        percent: float_at(data, 1),
        unit: byte_at(data, 5, "unit")?,
        value: float_at(data, 6),
    })
}

/// Command #196. The device echoes `[reference, unit]` and nothing else.
pub fn flow_unit_echo_matches(data: &[u8], reference: u8, unit: u8) -> bool {
    data == [reference, unit]
}

/// Command #240. Layout: `[0]` status, `[1]` unit.
pub fn decode_totalizer_state(data: &[u8]) -> Result<TotalizerState, ProtocolError> {
    Ok(TotalizerState {
        status: TotalizerStatus::from(byte_at(data, 0, "status")?),
        unit: byte_at(data, 1, "unit")?,
    })
}

/// Command #242. Layout: `[0]` unit, `[1..5]` count.
pub fn decode_totalizer_value(data: &[u8]) -> Result<TotalizerValue, ProtocolError> {
    Ok(TotalizerValue {
        unit: byte_at(data, 0, "unit")?,
        count: float_at(data, 1),
    })
}

/// Command #241. Layout: `[0]` resulting status.
pub fn decode_totalizer_control(data: &[u8]) -> Result<TotalizerStatus, ProtocolError> {
    Ok(TotalizerStatus::from(byte_at(data, 0, "status")?))
}
