//! End-to-end device session tests over a scripted byte channel.

use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use mfcbus_protocol::*;

// ============================================================================
// Scripted channel
// ============================================================================

/// Records every write and answers each one with the next scripted read.
#[derive(Debug, Default)]
struct ScriptedChannel {
    writes: Vec<Vec<u8>>,
    script: VecDeque<Vec<u8>>,
    pending: Vec<u8>,
}

impl ScriptedChannel {
    fn new(script: impl IntoIterator<Item = Vec<u8>>) -> Self {
        ScriptedChannel {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl ByteChannel for ScriptedChannel {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writes.push(bytes.to_vec());
        self.pending = self.script.pop_front().unwrap_or_default();
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.pending.len())
    }

    fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
        let count = count.min(self.pending.len());
        Ok(self.pending.drain(..count).collect())
    }
}

const TAG: &str = "28478010";
const ADDRESS: [u8; 5] = [0x0A, 0x3B, 0x12, 0x34, 0x56];

fn fast() -> TransportConfig {
    TransportConfig {
        settle_ms: 0,
        max_attempts: DEFAULT_MAX_ATTEMPTS,
    }
}

/// Frame a response the way a device does: preamble, header, status, data, checksum.
fn device_response(command: u8, data: &[u8]) -> Vec<u8> {
    let mut buf = vec![0xFF, 0xFF, 0xFF, 0x86];
    buf.extend_from_slice(&ADDRESS);
    buf.push(command);
    buf.push((data.len() + STATUS_LEN) as u8);
    buf.extend_from_slice(&[0x00, 0x00]);
    buf.extend_from_slice(data);
    buf.push(checksum(&buf));
    buf
}

fn identity_response() -> Vec<u8> {
    device_response(
        CMD_READ_UNIQUE_ID_BY_TAG,
        &[0xFE, 0x0A, 0x3B, 0x05, 0x05, 0x01, 0x00, 0x00, 0x00, 0x12, 0x34, 0x56],
    )
}

fn float_data(unit: u8, value: f32) -> Vec<u8> {
    let mut data = vec![unit];
    data.extend_from_slice(&ieee::pack_bytes(value));
    data
}

fn session_with(script: Vec<Vec<u8>>) -> DeviceSession<ScriptedChannel> {
    let mut full = vec![identity_response()];
    full.extend(script);
    let transport = TransportSession::with_config(ScriptedChannel::new(full), fast());
    DeviceSession::connect(Tag::new(TAG).unwrap(), transport).expect("discovery")
}

fn writes(session: &DeviceSession<ScriptedChannel>) -> &[Vec<u8>] {
    &session.transport().get_ref().writes
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_discovery_frame_checksums_to_zero() {
    let session = session_with(Vec::new());
    let frame = &writes(&session)[0];

    assert_eq!(&frame[..4], &[0xFF; 4]);
    assert_eq!(
        hex::encode(&frame[4..frame.len() - 2]),
        "8280000000000b06cb8d37e30c70"
    );
    assert_eq!(*frame.last().unwrap(), 0x00);

    let residue = frame[4..frame.len() - 1].iter().fold(0u8, |acc, &b| acc ^ b);
    assert_eq!(residue, 0);
}

#[test]
fn test_discovery_binds_long_address() {
    let session = session_with(Vec::new());
    assert_eq!(session.long_address().as_bytes(), &ADDRESS);
    assert_eq!(session.tag().as_str(), TAG);
}

#[test]
fn test_discovery_uses_last_eight_tag_characters() {
    let transport =
        TransportSession::with_config(ScriptedChannel::new([identity_response()]), fast());
    let session = DeviceSession::connect(Tag::new("MFC-28478010").unwrap(), transport).unwrap();
    assert_eq!(
        hex::encode(&writes(&session)[0][12..18]),
        packed_ascii::pack_hex(TAG)
    );
}

#[test]
fn test_discovery_failure() {
    let transport = TransportSession::with_config(ScriptedChannel::default(), fast());
    let err = DeviceSession::connect(Tag::new(TAG).unwrap(), transport).unwrap_err();

    match err {
        ProtocolError::Discovery(inner) => {
            assert!(matches!(
                *inner,
                ProtocolError::RetriesExhausted { attempts: 9, .. }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_discovery_rejects_short_identity() {
    let script = [device_response(CMD_READ_UNIQUE_ID_BY_TAG, &[0xFE, 0x0A])];
    let transport = TransportSession::with_config(ScriptedChannel::new(script), fast());
    let err = DeviceSession::connect(Tag::new(TAG).unwrap(), transport).unwrap_err();
    assert!(matches!(err, ProtocolError::Discovery(_)));
}

// ============================================================================
// Reads and writes
// ============================================================================

#[test]
fn test_read_primary_variable() {
    let mut session = session_with(vec![device_response(
        CMD_READ_PRIMARY_VARIABLE,
        &[0xAB, 0x3F, 0xC0, 0x00, 0x00],
    )]);
    assert_eq!(session.read_primary_variable(), 1.5);
}

#[test]
fn test_read_primary_variable_after_noise() {
    let mut session = session_with(vec![
        vec![0x86, 0x0A, 0x3B],
        Vec::new(),
        device_response(CMD_READ_PRIMARY_VARIABLE, &float_data(UNIT_LITERS_PER_MINUTE, 4.0)),
    ]);

    let pv = session.try_read_primary_variable().unwrap();
    assert_eq!(pv.unit, UNIT_LITERS_PER_MINUTE);
    assert_eq!(pv.value, 4.0);
    assert_eq!(writes(&session).len(), 4);
}

#[test]
fn test_short_byte_count_is_answered_once() {
    let mut raw = vec![0xFF, 0xFF, 0x86];
    raw.extend_from_slice(&ADDRESS);
    raw.extend_from_slice(&[CMD_READ_PRIMARY_VARIABLE, 0x01, 0x00]);
    raw.push(checksum(&raw));
    let mut session = session_with(vec![raw]);

    assert_eq!(session.read_primary_variable(), -1.0);
    assert_eq!(writes(&session).len(), 2);
}

#[test]
fn test_exhausted_retries_write_nine_times() {
    let mut session = session_with(Vec::new());
    let err = session.try_read_primary_variable().unwrap_err();

    assert!(matches!(
        err,
        ProtocolError::RetriesExhausted { attempts: 9, ref last } if last.is_decode_error()
    ));
    assert_eq!(writes(&session).len(), 1 + 9);
}

#[test]
fn test_exhausted_retries_yield_sentinel() {
    let mut session = session_with(Vec::new());
    assert_eq!(session.read_primary_variable(), -1.0);
    assert_eq!(session.read_setpoint(), (-1.0, 171));
    assert_eq!(session.read_totalizer_status(), (-1, 171));
    assert!(!session.select_flow_unit(UNIT_LITERS_PER_MINUTE, 0));
}

#[test]
fn test_read_flow_range() {
    let mut data = vec![0x01, 0x5B];
    data.extend_from_slice(&ieee::pack_bytes(1.165));
    data.push(0x20);
    data.extend_from_slice(&ieee::pack_bytes(0.0));
    data.push(0x0C);
    data.extend_from_slice(&ieee::pack_bytes(101.325));
    data.push(UNIT_LITERS_PER_MINUTE);
    data.extend_from_slice(&ieee::pack_bytes(10.0));

    let mut session = session_with(vec![
        device_response(CMD_READ_FLOW_RANGE, &data),
        device_response(CMD_READ_FLOW_RANGE, &data),
    ]);

    let range = session.try_read_flow_range(1).unwrap();
    assert_relative_eq!(range.density, 1.165);
    assert_relative_eq!(range.reference_pressure, 101.325);
    assert_eq!(session.read_flow_range(1), (10.0, UNIT_LITERS_PER_MINUTE));

    let frame = &writes(&session)[1];
    assert_eq!(&frame[10..13], &[CMD_READ_FLOW_RANGE, 0x01, 0x01]);
}

#[test]
fn test_write_setpoint_sends_requested_unit() {
    let mut data = float_data(UNIT_PERCENT, 50.0);
    data.extend_from_slice(&float_data(UNIT_LITERS_PER_MINUTE, 5.0));
    let mut session = session_with(vec![device_response(CMD_WRITE_SETPOINT, &data)]);

    assert_eq!(
        session.write_setpoint(50.0, UNIT_PERCENT),
        (5.0, UNIT_LITERS_PER_MINUTE)
    );
    let frame = &writes(&session)[1];
    assert_eq!(hex::encode(&frame[10..17]), "ec053942480000");
}

#[test]
fn test_read_setpoint_pads_truncated_float() {
    let data = [UNIT_PERCENT, 0x42, 0x48, 0x00, 0x00, UNIT_SELECTED, 0x3F, 0xC0];
    let mut session = session_with(vec![device_response(CMD_READ_SETPOINT, &data)]);

    let setpoint = session.try_read_setpoint().unwrap();
    assert_eq!(setpoint.percent, 50.0);
    assert_eq!(setpoint.unit, UNIT_SELECTED);
    assert_eq!(setpoint.value, 1.5);
}

#[test]
fn test_select_flow_unit_requires_exact_echo() {
    let mut session = session_with(vec![
        device_response(CMD_SELECT_FLOW_UNIT, &[0x00, UNIT_LITERS_PER_MINUTE]),
        device_response(CMD_SELECT_FLOW_UNIT, &[UNIT_LITERS_PER_MINUTE, 0x00]),
    ]);

    assert!(session.select_flow_unit(UNIT_LITERS_PER_MINUTE, 0x00));
    assert!(!session.select_flow_unit(UNIT_LITERS_PER_MINUTE, 0x00));

    let frame = &writes(&session)[1];
    assert_eq!(&frame[10..14], &[CMD_SELECT_FLOW_UNIT, 0x02, 0x00, UNIT_LITERS_PER_MINUTE]);
}

#[test]
fn test_totalizer_operations() {
    let mut session = session_with(vec![
        device_response(CMD_SET_TOTALIZER_CONTROL, &[0x01]),
        device_response(CMD_READ_TOTALIZER_STATUS, &[0x01, UNIT_SELECTED]),
        device_response(
            CMD_READ_TOTALIZER_VALUE,
            &float_data(UNIT_LITERS_PER_MINUTE, 12.5),
        ),
    ]);

    assert_eq!(session.control_totalizer(TotalizerCommand::Start), 1);
    let state = session.try_read_totalizer_status().unwrap();
    assert_eq!(state.status, TotalizerStatus::Running);
    assert_eq!(state.unit, UNIT_SELECTED);
    assert_eq!(session.read_totalizer_value(), (12.5, UNIT_LITERS_PER_MINUTE));
}

#[test]
fn test_embedded_sync_byte_shifts_reading() {
    // 0xFF inside the float is dropped before de-framing, so the float borrows
    // the device checksum as its last byte.
    let data = [UNIT_LITERS_PER_MINUTE, 0x3F, 0xFF, 0x00, 0x00];
    let raw = device_response(CMD_READ_PRIMARY_VARIABLE, &data);
    let trailing = *raw.last().unwrap();
    let mut session = session_with(vec![raw]);

    let pv = session.try_read_primary_variable().unwrap();
    assert_eq!(ieee::pack_bytes(pv.value), [0x3F, 0x00, 0x00, trailing]);
}

// ============================================================================
// Timing
// ============================================================================

#[test]
fn test_settle_interval_per_attempt() {
    let config = TransportConfig {
        settle_ms: 10,
        max_attempts: 3,
    };
    let mut transport = TransportSession::with_config(ScriptedChannel::default(), config);

    let started = Instant::now();
    let err = transport.send_and_receive(&[0xFF, 0x82]).unwrap_err();
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert!(matches!(err, ProtocolError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(transport.get_ref().writes.len(), 3);
}
