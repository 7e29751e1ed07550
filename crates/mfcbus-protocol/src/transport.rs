//! Byte channel abstraction and the bounded retry loop.
//!
//! A [`TransportSession`] owns the channel exclusively. Each attempt writes the
//! whole frame, waits for the device to answer, drains whatever bytes arrived and
//! hands them to the [`FrameCodec`]. Only decode failures are retried; channel
//! I/O errors end the exchange at once.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use mfcbus_metrics::{metric_defs, BusLabels};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::commands::Command;
use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::{DecodedResponse, FrameCodec};

// ============================================================================
// Byte Channel
// ============================================================================

/// A half-duplex byte stream, already configured for 19200 baud 8O1.
pub trait ByteChannel {
    /// Write every byte of `bytes`.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read up to `count` bytes.
    fn read(&mut self, count: usize) -> io::Result<Vec<u8>>;
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
        (**self).read(count)
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
        (**self).read(count)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Retry loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Wait between writing a frame and reading the answer (milliseconds).
    pub settle_ms: u64,
    /// Attempts per exchange before giving up. Zero is treated as one.
    pub max_attempts: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            settle_ms: DEFAULT_SETTLE_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl TransportConfig {
    /// The settle interval as a [`Duration`].
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

// ============================================================================
// Transport Session
// ============================================================================

/// Owns a byte channel and runs write/settle/read/decode exchanges over it.
#[derive(Debug)]
pub struct TransportSession<C> {
    channel: C,
    config: TransportConfig,
    codec: FrameCodec,
    labels: BusLabels,
}

impl<C: ByteChannel> TransportSession<C> {
    /// Create a session with the default 200 ms settle time and 9 attempts.
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, TransportConfig::default())
    }

    /// Create a session with explicit retry settings.
    pub fn with_config(channel: C, config: TransportConfig) -> Self {
        TransportSession {
            channel,
            config,
            codec: FrameCodec::new(),
            labels: BusLabels::default(),
        }
    }

    /// Set the metric labels used for this session.
    pub fn with_labels(mut self, labels: BusLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Metric labels of this session.
    pub fn labels(&self) -> &BusLabels {
        &self.labels
    }

    pub(crate) fn bind_tag(&mut self, tag: &str) {
        self.labels.tag = tag.to_string();
    }

    /// Retry settings.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Encode `command` for `address` and exchange it.
    pub fn exchange(
        &mut self,
        command: &Command,
        address: &[u8; LONG_ADDRESS_LEN],
    ) -> ProtocolResult<DecodedResponse> {
        let frame = FrameCodec::encode(&command.encode(address));
        debug!(
            "Transport[{}]: {} to {}",
            self.labels.port,
            command.name(),
            hex::encode(address)
        );
        self.send_and_receive(&frame)
    }

    /// Send a complete frame and return the first response that decodes.
    ///
    /// Returns [`ProtocolError::RetriesExhausted`] carrying the last decode error
    /// once every attempt failed.
    pub fn send_and_receive(&mut self, frame: &[u8]) -> ProtocolResult<DecodedResponse> {
        let started = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);
        let labels = self.labels.to_labels();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(frame) {
                Ok(response) => {
                    metrics::histogram!(metric_defs::EXCHANGE_ATTEMPTS.name, &labels)
                        .record(f64::from(attempt));
                    metrics::histogram!(metric_defs::EXCHANGE_LATENCY.name, &labels)
                        .record(started.elapsed().as_secs_f64() * 1000.0);
                    return Ok(response);
                }
                Err(err) if err.is_decode_error() => {
                    metrics::counter!(metric_defs::DECODE_FAILURES.name, &labels).increment(1);
                    debug!(
                        "Transport[{}]: attempt {}/{} failed: {}",
                        self.labels.port, attempt, max_attempts, err
                    );
                    if attempt >= max_attempts {
                        warn!(
                            "Transport[{}]: giving up after {} attempts: {}",
                            self.labels.port, attempt, err
                        );
                        metrics::counter!(metric_defs::EXCHANGES_EXHAUSTED.name, &labels)
                            .increment(1);
                        return Err(ProtocolError::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn attempt(&mut self, frame: &[u8]) -> ProtocolResult<DecodedResponse> {
        let labels = self.labels.to_labels();
        trace!("Transport[{}]: tx {}", self.labels.port, hex::encode(frame));
        self.channel.write_all(frame)?;
        metrics::counter!(metric_defs::FRAMES_SENT.name, &labels).increment(1);
        metrics::counter!(metric_defs::BYTES_SENT.name, &labels).increment(frame.len() as u64);

        thread::sleep(self.config.settle());

        let available = self.channel.bytes_available()?;
        let raw = self.channel.read(available)?;
        metrics::counter!(metric_defs::BYTES_RECEIVED.name, &labels).increment(raw.len() as u64);
        trace!("Transport[{}]: rx {}", self.labels.port, hex::encode(&raw));

        self.codec.clear();
        self.codec.push(&raw);
        self.codec.decode()
    }

    /// Get a reference to the channel.
    pub fn get_ref(&self) -> &C {
        &self.channel
    }

    /// Get a mutable reference to the channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Release the channel.
    pub fn into_inner(self) -> C {
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays one canned read per write.
    #[derive(Default)]
    struct Replay {
        writes: Vec<Vec<u8>>,
        reads: VecDeque<Vec<u8>>,
        pending: Vec<u8>,
    }

    impl ByteChannel for Replay {
        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.writes.push(bytes.to_vec());
            self.pending = self.reads.pop_front().unwrap_or_default();
            Ok(())
        }

        fn bytes_available(&mut self) -> io::Result<usize> {
            Ok(self.pending.len())
        }

        fn read(&mut self, count: usize) -> io::Result<Vec<u8>> {
            Ok(self.pending.drain(..count).collect())
        }
    }

    struct Broken;

    impl ByteChannel for Broken {
        fn write_all(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }

        fn bytes_available(&mut self) -> io::Result<usize> {
            Ok(0)
        }

        fn read(&mut self, _count: usize) -> io::Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn fast() -> TransportConfig {
        TransportConfig {
            settle_ms: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    fn good_response() -> Vec<u8> {
        vec![
            0xFF, 0xFF, 0x86, 0x0A, 0x3B, 0x12, 0x34, 0x56, 0x01, 0x07, 0x00, 0x00, 0xAB, 0x3F,
            0xC0, 0x00, 0x00, 0x5A,
        ]
    }

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.settle_ms, 200);
        assert_eq!(config.max_attempts, 9);
        assert_eq!(config.settle(), Duration::from_millis(200));
    }

    #[test]
    fn test_first_attempt_succeeds() {
        let mut channel = Replay::default();
        channel.reads.push_back(good_response());
        let mut transport = TransportSession::with_config(channel, fast());

        let response = transport.send_and_receive(&[0xFF, 0x82, 0x00]).unwrap();
        assert_eq!(response.command, 0x01);
        assert_eq!(transport.get_ref().writes.len(), 1);
    }

    #[test]
    fn test_retries_until_valid() {
        let mut channel = Replay::default();
        channel.reads.push_back(vec![0x86, 0x0A]);
        channel.reads.push_back(Vec::new());
        channel.reads.push_back(good_response());
        let mut transport = TransportSession::with_config(channel, fast());

        let response = transport.send_and_receive(&[0x01]).unwrap();
        assert_eq!(&response.data[..], &[0xAB, 0x3F, 0xC0, 0x00, 0x00]);
        assert_eq!(transport.get_ref().writes.len(), 3);
    }

    #[test]
    fn test_exhaustion_reports_last_error() {
        let mut transport = TransportSession::with_config(Replay::default(), fast());
        let err = transport.send_and_receive(&[0x01]).unwrap_err();

        match err {
            ProtocolError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 9);
                assert!(matches!(*last, ProtocolError::FrameTooShort { actual: 0, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.get_ref().writes.len(), 9);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let config = TransportConfig {
            settle_ms: 0,
            max_attempts: 0,
        };
        let mut transport = TransportSession::with_config(Replay::default(), config);
        assert!(transport.send_and_receive(&[0x01]).is_err());
        assert_eq!(transport.get_ref().writes.len(), 1);
    }

    #[test]
    fn test_io_errors_are_not_retried() {
        let mut transport = TransportSession::with_config(Broken, fast());
        let err = transport.send_and_receive(&[0x01]).unwrap_err();
        assert!(matches!(err, ProtocolError::Io(_)));
    }

    #[test]
    fn test_exchange_frames_command() {
        let mut channel = Replay::default();
        channel.reads.push_back(good_response());
        let mut transport = TransportSession::with_config(&mut channel, fast())
            .with_labels(BusLabels::new("test"));

        transport
            .exchange(&Command::ReadPrimaryVariable, &[0x0A, 0x3B, 0x12, 0x34, 0x56])
            .unwrap();
        assert_eq!(transport.labels().port, "test");
        drop(transport);

        let frame = &channel.writes[0];
        assert_eq!(&frame[..4], &[0xFF; 4]);
        assert_eq!(&frame[4..12], &[0x82, 0x0A, 0x3B, 0x12, 0x34, 0x56, 0x01, 0x00]);
        assert_eq!(*frame.last().unwrap(), 0x00);
    }

    #[test]
    fn test_settle_time_is_observed() {
        let config = TransportConfig {
            settle_ms: 20,
            max_attempts: 2,
        };
        let mut transport = TransportSession::with_config(Replay::default(), config);
        let started = Instant::now();
        let _ = transport.send_and_receive(&[0x01]);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
