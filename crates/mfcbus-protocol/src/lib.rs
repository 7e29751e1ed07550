//! S-Protocol driver for RS-485 mass-flow controllers
//!
//! This crate implements the host side of the S-Protocol, a HART-derived
//! command/response protocol spoken by mass-flow controllers on a shared RS-485
//! bus. It covers the codecs (packed-ASCII tags, XOR checksum, IEEE-754 floats,
//! frames), a bounded retry loop over an injected byte channel, and a device
//! session exposing the discovery handshake and command set.
//!
//! # Protocol Overview
//!
//! Every exchange is a single command frame followed by a single response:
//!
//! - **Discovery** (command #11): sent to the broadcast address with the packed
//!   device tag; the answer yields the device's 5-byte long address
//! - **Commands**: addressed to the long address, carrying an opcode, a byte
//!   count and a payload
//! - **Responses**: echo the address and opcode, then two status bytes and the
//!   command's data
//!
//! # Example
//!
//! ```rust,ignore
//! use mfcbus_protocol::{DeviceSession, Tag, TransportSession};
//!
//! let transport = TransportSession::new(channel);
//! let mut device = DeviceSession::connect(Tag::new("28478010")?, transport)?;
//!
//! let flow = device.read_primary_variable();
//! let (setpoint, unit) = device.write_setpoint(50.0, mfcbus_protocol::UNIT_PERCENT);
//! ```

mod checksum;
mod commands;
mod constants;
mod device;
mod error;
mod frame;
mod responses;
mod transport;
mod types;

pub mod ieee;
pub mod packed_ascii;

pub use checksum::*;
pub use commands::*;
pub use constants::*;
pub use device::*;
pub use error::*;
pub use frame::*;
pub use responses::*;
pub use transport::*;
pub use types::*;
