//! Metrics for S-Protocol bus traffic.
//!
//! Every metric the driver emits is declared here as a const [`Metric`], so names,
//! units and label keys live in one place. The `metrics` crate is re-exported; without
//! an installed recorder every counter and histogram is a no-op.
//!
//! # Example
//!
//! ```rust,ignore
//! use mfcbus_metrics::{metric_defs, describe_metrics, BusLabels};
//!
//! describe_metrics();
//!
//! let labels = BusLabels::new("/dev/ttyUSB0").with_tag("28478010");
//! metrics::counter!(metric_defs::FRAMES_SENT.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use mfcbus_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const RETRIES: Metric = Metric::counter("mfcbus.example.retries")
///     .with_description("Retries")
///     .with_unit(Unit::Count)
///     .with_labels(&["port"]);
///
/// assert_eq!(RETRIES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "mfcbus.transport.attempts").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a counter declaration.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a gauge declaration.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Creates a histogram declaration.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description)
            }
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// All metric definitions emitted by the driver.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every bus metric.
    pub const BUS_LABELS: &[&str] = &["port", "tag"];

    // ========================================================================
    // Transport
    // ========================================================================

    /// Frames written to the channel, one per attempt.
    pub const FRAMES_SENT: Metric = Metric::counter("mfcbus.transport.frames_sent")
        .with_description("Command frames written to the bus")
        .with_unit(Unit::Count)
        .with_labels(BUS_LABELS);

    /// Bytes written to the channel.
    pub const BYTES_SENT: Metric = Metric::counter("mfcbus.transport.bytes_sent")
        .with_description("Bytes written to the bus")
        .with_unit(Unit::Bytes)
        .with_labels(BUS_LABELS);

    /// Bytes read back from the channel, sync bytes included.
    pub const BYTES_RECEIVED: Metric = Metric::counter("mfcbus.transport.bytes_received")
        .with_description("Bytes read from the bus")
        .with_unit(Unit::Bytes)
        .with_labels(BUS_LABELS);

    /// Responses that could not be de-framed and were retried.
    pub const DECODE_FAILURES: Metric = Metric::counter("mfcbus.transport.decode_failures")
        .with_description("Responses rejected by the frame decoder")
        .with_unit(Unit::Count)
        .with_labels(BUS_LABELS);

    /// Exchanges that used up the whole retry budget.
    pub const EXCHANGES_EXHAUSTED: Metric = Metric::counter("mfcbus.transport.exhausted")
        .with_description("Exchanges that failed after every retry")
        .with_unit(Unit::Count)
        .with_labels(BUS_LABELS);

    /// Attempts needed by a successful exchange.
    pub const EXCHANGE_ATTEMPTS: Metric = Metric::histogram("mfcbus.transport.attempts")
        .with_description("Attempts needed per successful exchange")
        .with_unit(Unit::Count)
        .with_labels(BUS_LABELS);

    /// Wall time of a successful exchange, retries included.
    pub const EXCHANGE_LATENCY: Metric = Metric::histogram("mfcbus.transport.latency_ms")
        .with_description("Exchange latency in milliseconds")
        .with_unit(Unit::Milliseconds)
        .with_labels(BUS_LABELS);

    // ========================================================================
    // Device
    // ========================================================================

    /// Discovery handshakes that produced a long address.
    pub const DISCOVERIES: Metric = Metric::counter("mfcbus.device.discoveries")
        .with_description("Successful discovery handshakes")
        .with_unit(Unit::Count)
        .with_labels(BUS_LABELS);

    /// Readings replaced by the -1 / unknown-unit sentinel.
    pub const SENTINEL_READINGS: Metric = Metric::counter("mfcbus.device.sentinel_readings")
        .with_description("Readings masked by the sentinel value")
        .with_unit(Unit::Count)
        .with_labels(&["port", "tag", "command"]);

    // ========================================================================
    // Poller
    // ========================================================================

    /// Devices answering discovery on a port when polling starts.
    pub const CONNECTED_DEVICES: Metric = Metric::gauge("mfcbus.poller.connected_devices")
        .with_description("Devices discovered on the port")
        .with_unit(Unit::Count)
        .with_labels(&["port"]);

    /// All metrics, in declaration order.
    pub const ALL: &[&Metric] = &[
        &FRAMES_SENT,
        &BYTES_SENT,
        &BYTES_RECEIVED,
        &DECODE_FAILURES,
        &EXCHANGES_EXHAUSTED,
        &EXCHANGE_ATTEMPTS,
        &EXCHANGE_LATENCY,
        &DISCOVERIES,
        &SENTINEL_READINGS,
        &CONNECTED_DEVICES,
    ];
}

/// Labels identifying one device session on one serial port.
///
/// ```rust
/// use mfcbus_metrics::BusLabels;
///
/// let labels = BusLabels::new("COM2").with_tag("28478010");
/// assert!(labels.to_labels().contains(&("tag", "28478010".to_string())));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusLabels {
    /// Serial port name, or a test double's name.
    pub port: String,
    /// Device tag, empty until discovery starts.
    pub tag: String,
}

impl BusLabels {
    /// Labels for a port with no device bound yet.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            tag: String::new(),
        }
    }

    /// Binds the labels to a device tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Converts to the `metrics` label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("port", self.port.clone()), ("tag", self.tag.clone())]
    }

    /// Labels with additional key-value pairs appended.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Registers descriptions for every metric in [`metric_defs::ALL`].
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Installs a Prometheus recorder serving `/metrics` on `addr`, then describes all metrics.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}
