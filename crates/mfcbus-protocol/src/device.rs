//! Device session: discovery handshake and the typed command set.
//!
//! [`DeviceSession::connect`] discovers the device owning a tag and only returns a
//! session once its long address is known, so every command method can assume
//! discovery succeeded.
//!
//! Each operation comes in two forms. The `try_*` methods return the full decoded
//! record or the error that prevented it. The plain methods mask any failure with
//! the sentinel reading (`-1`, unit `171`) and log a warning; they exist for
//! callers that poll and display values and cannot act on an error anyway.

use mfcbus_metrics::metric_defs;
use tracing::{debug, warn};

use crate::commands::Command;
use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};
use crate::responses::*;
use crate::transport::{ByteChannel, TransportSession};
use crate::types::*;

/// A discovered device on a byte channel.
#[derive(Debug)]
pub struct DeviceSession<C> {
    tag: Tag,
    identity: DeviceIdentity,
    address: LongAddress,
    transport: TransportSession<C>,
}

impl<C: ByteChannel> DeviceSession<C> {
    /// Discover the device owning `tag` and bind a session to it.
    ///
    /// Discovery is sent to the broadcast address. On failure the transport is
    /// dropped with the error; the caller builds a fresh one to try again.
    pub fn connect(tag: Tag, mut transport: TransportSession<C>) -> ProtocolResult<Self> {
        transport.bind_tag(tag.as_str());
        debug!("Device[{}]: discovering", tag);

        let command = Command::ReadUniqueIdByTag { tag: tag.clone() };
        let identity = transport
            .exchange(&command, &BROADCAST_ADDRESS)
            .and_then(|response| decode_identity(&response.data))
            .map_err(|err| {
                warn!("Device[{}]: discovery failed: {}", tag, err);
                ProtocolError::Discovery(Box::new(err))
            })?;

        let address = identity.long_address();
        debug!("Device[{}]: ready at {}", tag, address);

        metrics::counter!(metric_defs::DISCOVERIES.name, &transport.labels().to_labels())
            .increment(1);

        Ok(DeviceSession {
            tag,
            identity,
            address,
            transport,
        })
    }

    /// Tag the session was discovered with.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Identity reported during discovery.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Long address every command is sent to.
    pub fn long_address(&self) -> LongAddress {
        self.address
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &TransportSession<C> {
        &self.transport
    }

    /// Get a mutable reference to the transport.
    pub fn transport_mut(&mut self) -> &mut TransportSession<C> {
        &mut self.transport
    }

    /// Release the transport.
    pub fn into_transport(self) -> TransportSession<C> {
        self.transport
    }

    fn exchange(&mut self, command: &Command) -> ProtocolResult<bytes::Bytes> {
        let response = self.transport.exchange(command, self.address.as_bytes())?;
        Ok(response.data)
    }

    // ========================================================================
    // Strict API
    // ========================================================================

    /// Read the primary variable (command #1).
    pub fn try_read_primary_variable(&mut self) -> ProtocolResult<PrimaryVariable> {
        let data = self.exchange(&Command::ReadPrimaryVariable)?;
        decode_primary_variable(&data)
    }

    /// Read density, reference conditions and flow range for a gas (command #151).
    pub fn try_read_flow_range(&mut self, gas_select: u8) -> ProtocolResult<FlowRange> {
        if !(GAS_SELECT_MIN..=GAS_SELECT_MAX).contains(&gas_select) {
            return Err(ProtocolError::InvalidArgument(format!(
                "gas select code {gas_select} (expected {GAS_SELECT_MIN}-{GAS_SELECT_MAX})"
            )));
        }
        let data = self.exchange(&Command::ReadFlowRange { gas_select })?;
        decode_flow_range(&data)
    }

    /// Read the setpoint (command #235).
    pub fn try_read_setpoint(&mut self) -> ProtocolResult<Setpoint> {
        let data = self.exchange(&Command::ReadSetpoint)?;
        decode_setpoint(&data)
    }

    /// Write the setpoint in `unit` (command #236) and return what the device
    /// accepted.
    pub fn try_write_setpoint(&mut self, value: f32, unit: u8) -> ProtocolResult<Setpoint> {
        let data = self.exchange(&Command::WriteSetpoint { unit, value })?;
        decode_setpoint(&data)
    }

    /// Select the flow unit and reference (command #196).
    ///
    /// `Ok(true)` only when the device echoes exactly `[reference, unit]`.
    pub fn try_select_flow_unit(&mut self, unit: u8, reference: u8) -> ProtocolResult<bool> {
        let data = self.exchange(&Command::SelectFlowUnit { reference, unit })?;
        Ok(flow_unit_echo_matches(&data, reference, unit))
    }

    /// Read the totalizer status (command #240).
    pub fn try_read_totalizer_status(&mut self) -> ProtocolResult<TotalizerState> {
        let data = self.exchange(&Command::ReadTotalizerStatus)?;
        decode_totalizer_state(&data)
    }

    /// Read the totalizer count (command #242).
    pub fn try_read_totalizer_value(&mut self) -> ProtocolResult<TotalizerValue> {
        let data = self.exchange(&Command::ReadTotalizerValue)?;
        decode_totalizer_value(&data)
    }

    /// Start, stop or reset the totalizer (command #241).
    pub fn try_control_totalizer(
        &mut self,
        command: TotalizerCommand,
    ) -> ProtocolResult<TotalizerStatus> {
        let data = self.exchange(&Command::ControlTotalizer { command })?;
        decode_totalizer_control(&data)
    }

    // ========================================================================
    // Sentinel API
    // ========================================================================

    fn masked<T>(&self, command: &'static str, result: ProtocolResult<T>, sentinel: T) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "Device[{}]: {} failed, reporting sentinel: {}",
                    self.tag, command, err
                );
                let labels = self
                    .transport
                    .labels()
                    .with(&[("command", command.to_string())]);
                metrics::counter!(metric_defs::SENTINEL_READINGS.name, &labels).increment(1);
                sentinel
            }
        }
    }

    /// Primary variable, or `-1` on failure.
    pub fn read_primary_variable(&mut self) -> f32 {
        let result = self.try_read_primary_variable().map(|pv| pv.value);
        self.masked("read_primary_variable", result, SENTINEL_VALUE)
    }

    /// Flow range and its unit, or `(-1, 171)` on failure or an invalid code.
    pub fn read_flow_range(&mut self, gas_select: u8) -> (f32, u8) {
        let result = self
            .try_read_flow_range(gas_select)
            .map(|range| (range.flow_range, range.flow_unit));
        self.masked("read_flow_range", result, (SENTINEL_VALUE, SENTINEL_UNIT))
    }

    /// Setpoint in the selected unit, or `(-1, 171)` on failure.
    pub fn read_setpoint(&mut self) -> (f32, u8) {
        let result = self.try_read_setpoint().map(|sp| (sp.value, sp.unit));
        self.masked("read_setpoint", result, (SENTINEL_VALUE, SENTINEL_UNIT))
    }

    /// Write the setpoint; returns the accepted setpoint or `(-1, 171)`.
    pub fn write_setpoint(&mut self, value: f32, unit: u8) -> (f32, u8) {
        let result = self
            .try_write_setpoint(value, unit)
            .map(|sp| (sp.value, sp.unit));
        self.masked("write_setpoint", result, (SENTINEL_VALUE, SENTINEL_UNIT))
    }

    /// Select the flow unit; `false` on a mismatched echo or failure.
    pub fn select_flow_unit(&mut self, unit: u8, reference: u8) -> bool {
        let result = self.try_select_flow_unit(unit, reference);
        self.masked("select_flow_unit", result, false)
    }

    /// Totalizer status code and unit, or `(-1, 171)` on failure.
    pub fn read_totalizer_status(&mut self) -> (i16, u8) {
        let result = self
            .try_read_totalizer_status()
            .map(|state| (i16::from(state.status.code()), state.unit));
        self.masked("read_totalizer_status", result, (SENTINEL_STATUS, SENTINEL_UNIT))
    }

    /// Totalizer count and unit, or `(-1, 171)` on failure.
    pub fn read_totalizer_value(&mut self) -> (f32, u8) {
        let result = self
            .try_read_totalizer_value()
            .map(|total| (total.count, total.unit));
        self.masked("read_totalizer_value", result, (SENTINEL_VALUE, SENTINEL_UNIT))
    }

    /// Control the totalizer; returns the resulting status code or `-1`.
    pub fn control_totalizer(&mut self, command: TotalizerCommand) -> i16 {
        let result = self
            .try_control_totalizer(command)
            .map(|status| i16::from(status.code()));
        self.masked("control_totalizer", result, SENTINEL_STATUS)
    }
}
