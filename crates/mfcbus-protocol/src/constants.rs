//! Protocol constants
//!
//! Command codes, frame layout sizes, unit codes and timing defaults for the
//! S-Protocol spoken by SLA58xx-series mass-flow controllers.

// ============================================================================
// Framing
// ============================================================================

/// Sync byte sent ahead of every command and idled on the bus between frames.
pub const SYNC_BYTE: u8 = 0xFF;
/// Number of sync bytes in the outbound preamble.
pub const PREAMBLE_LEN: usize = 4;
/// Byte appended after the checksum to close a frame.
pub const FRAME_TERMINATOR: u8 = 0x00;
/// Start delimiter of a master-to-slave frame using a long address.
pub const DELIMITER_MASTER_LONG: u8 = 0x82;
/// Address used for discovery, before the long address is known.
pub const BROADCAST_ADDRESS: [u8; LONG_ADDRESS_LEN] = [0x80, 0x00, 0x00, 0x00, 0x00];

// ============================================================================
// Sizes
// ============================================================================

/// Characters in a device tag.
pub const TAG_LEN: usize = 8;
/// Bytes in a packed-ASCII tag.
pub const PACKED_TAG_LEN: usize = 6;
/// Bytes in a long address.
pub const LONG_ADDRESS_LEN: usize = 5;
/// Delimiter + address + command + byte count.
pub const RESPONSE_HEADER_LEN: usize = 8;
/// Response status bytes leading every payload.
pub const STATUS_LEN: usize = 2;
/// Bytes in an IEEE-754 single.
pub const IEEE_LEN: usize = 4;
/// Hex digits in an IEEE-754 single.
pub const IEEE_HEX_LEN: usize = 2 * IEEE_LEN;

// ============================================================================
// Command Codes
// ============================================================================

/// Command #11: read unique identifier associated with tag (discovery).
pub const CMD_READ_UNIQUE_ID_BY_TAG: u8 = 0x0B;
/// Command #1: read primary variable.
pub const CMD_READ_PRIMARY_VARIABLE: u8 = 0x01;
/// Command #151: read gas density, flow reference and flow range.
pub const CMD_READ_FLOW_RANGE: u8 = 0x97;
/// Command #196: select flow unit.
pub const CMD_SELECT_FLOW_UNIT: u8 = 0xC4;
/// Command #235: read setpoint in percent and selected units.
pub const CMD_READ_SETPOINT: u8 = 0xEB;
/// Command #236: write setpoint in percent or selected units.
pub const CMD_WRITE_SETPOINT: u8 = 0xEC;
/// Command #240: read totalizer status.
pub const CMD_READ_TOTALIZER_STATUS: u8 = 0xF0;
/// Command #241: set totalizer control.
pub const CMD_SET_TOTALIZER_CONTROL: u8 = 0xF1;
/// Command #242: read totalizer value and unit.
pub const CMD_READ_TOTALIZER_VALUE: u8 = 0xF2;

// ============================================================================
// Unit Codes
// ============================================================================

/// Litres per minute.
pub const UNIT_LITERS_PER_MINUTE: u8 = 17;
/// Percent of full scale.
pub const UNIT_PERCENT: u8 = 57;
/// Millilitres per minute.
pub const UNIT_MILLILITERS_PER_MINUTE: u8 = 171;
/// Cubic centimetres per minute.
pub const UNIT_CUBIC_CM_PER_MINUTE: u8 = 240;
/// "Not used": the setpoint is expressed in the selected flow unit.
pub const UNIT_SELECTED: u8 = 250;

/// Lowest gas selection code accepted by command #151.
pub const GAS_SELECT_MIN: u8 = 1;
/// Highest gas selection code accepted by command #151.
pub const GAS_SELECT_MAX: u8 = 6;

// ============================================================================
// Sentinels
// ============================================================================

/// Value reported in place of a reading that could not be obtained.
pub const SENTINEL_VALUE: f32 = -1.0;
/// Unit code reported alongside [`SENTINEL_VALUE`].
pub const SENTINEL_UNIT: u8 = UNIT_MILLILITERS_PER_MINUTE;
/// Status code reported in place of a totalizer status that could not be obtained.
pub const SENTINEL_STATUS: i16 = -1;

// ============================================================================
// Timing
// ============================================================================

/// Time the addressed device gets to answer before the bus is read.
pub const DEFAULT_SETTLE_MS: u64 = 200;
/// Attempts per exchange before the transport gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 9;

// ============================================================================
// Serial Line
// ============================================================================

/// Line speed expected by the device.
pub const BAUD_RATE: u32 = 19_200;
