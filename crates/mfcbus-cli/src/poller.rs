//! Devices polled together over one serial port.

use mfcbus_metrics::{metric_defs, BusLabels};
use mfcbus_protocol::{ByteChannel, DeviceSession, Tag, TransportConfig, TransportSession};
use tracing::{info, warn};

use crate::report::Snapshot;
use crate::serial::SharedBus;

/// A named device session on a shared bus.
pub struct PolledDevice<C> {
    /// Name from the config file, or the tag.
    pub name: String,
    /// Connected session.
    pub session: DeviceSession<SharedBus<C>>,
}

impl<C: ByteChannel> PolledDevice<C> {
    /// Read full scale, setpoint and flow.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::read(&self.name, &mut self.session)
    }
}

/// Discover every target on `bus`. Devices that do not answer are skipped.
///
/// The number found is published on the connected-devices gauge for `port`.
pub fn connect_all<C: ByteChannel>(
    bus: &SharedBus<C>,
    port: &str,
    config: TransportConfig,
    targets: &[(String, Tag)],
) -> Vec<PolledDevice<C>> {
    let mut devices = Vec::with_capacity(targets.len());
    for (name, tag) in targets {
        let transport = TransportSession::with_config(bus.clone(), config)
            .with_labels(BusLabels::new(port));
        match DeviceSession::connect(tag.clone(), transport) {
            Ok(session) => {
                info!("{}: {} at {}", name, tag, session.long_address());
                devices.push(PolledDevice {
                    name: name.clone(),
                    session,
                });
            }
            Err(err) => warn!("{}: skipped, {}", name, err),
        }
    }

    metrics::gauge!(metric_defs::CONNECTED_DEVICES.name, "port" => port.to_string())
        .set(devices.len() as f64);
    devices
}
