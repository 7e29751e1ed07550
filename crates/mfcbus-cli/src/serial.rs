//! Serial port adapter.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::time::Duration;

use mfcbus_protocol::ByteChannel;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::config::SerialSettings;
use crate::error::{CliError, CliResult};

/// A serial port set up for the S-Protocol line format (8 data bits, odd parity,
/// 1 stop bit).
pub struct SerialChannel {
    name: String,
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Open the port named in `settings`.
    pub fn open(settings: &SerialSettings) -> CliResult<Self> {
        let name = settings.port.clone().ok_or(CliError::NoPort)?;
        let port = serialport::new(&name, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::Odd)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(settings.timeout_ms))
            .open()?;
        debug!("Serial[{}]: opened at {} baud 8O1", name, settings.baud_rate);
        Ok(SerialChannel { name, port })
    }

    /// Port name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ByteChannel for SerialChannel {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        let mut filled = 0;
        while filled < count {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

/// One channel shared by every device session on the same bus.
///
/// Sessions take turns; each exchange borrows the channel for its duration.
pub struct SharedBus<C>(Rc<RefCell<C>>);

impl<C> SharedBus<C> {
    /// Wrap a channel for sharing.
    pub fn new(channel: C) -> Self {
        SharedBus(Rc::new(RefCell::new(channel)))
    }

    /// Run `f` with the channel borrowed.
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.0.borrow())
    }
}

impl<C> Clone for SharedBus<C> {
    fn clone(&self) -> Self {
        SharedBus(Rc::clone(&self.0))
    }
}

impl<C: ByteChannel> ByteChannel for SharedBus<C> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.0.borrow_mut().write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        self.0.borrow_mut().bytes_available()
    }

    fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
        self.0.borrow_mut().read(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Loopback {
        buf: Vec<u8>,
    }

    impl ByteChannel for Loopback {
        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.buf.extend_from_slice(bytes);
            Ok(())
        }

        fn bytes_available(&mut self) -> io::Result<usize> {
            Ok(self.buf.len())
        }

        fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
            Ok(self.buf.drain(..count).collect())
        }
    }

    #[test]
    fn test_shared_bus_clones_see_same_channel() {
        let mut a = SharedBus::new(Loopback::default());
        let mut b = a.clone();

        a.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(b.bytes_available().unwrap(), 3);
        assert_eq!(b.read(2).unwrap(), vec![1, 2]);
        assert_eq!(a.with(|c| c.buf.len()), 1);
    }

    #[test]
    fn test_open_without_port() {
        let settings = SerialSettings::default();
        assert!(matches!(SerialChannel::open(&settings), Err(CliError::NoPort)));
    }
}
