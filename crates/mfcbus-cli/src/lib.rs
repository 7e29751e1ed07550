//! Support library for the `mfcbus` command-line tool: configuration file,
//! serial port adapter and the device actions the binary exposes.

mod config;
mod error;
mod poller;
mod report;
mod serial;

pub use config::*;
pub use error::*;
pub use poller::*;
pub use report::*;
pub use serial::*;
