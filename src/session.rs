//! # Battery Session Module
//!
//! Drives one Bluetooth connection to a battery from discovery to
//! disconnect. The session only ever *sends* `SessionUpdate`s; the UI thread
//! owns all state.
//!
//! ## Connect Sequence
//! 1. Find the peripheral selected in the scan (one short re-scan)
//! 2. Single best-effort `connect`, then `discover_services`
//! 3. Walk every service/characteristic: log UUIDs, read readable values,
//!    subscribe to notifying ones
//! 4. Multiplex notifications, adapter disconnect events and the stop flag
//!
//! Every update is stamped with the `SessionId` the UI handed out with the
//! command that started the session, so the UI can ignore sessions it has
//! already moved past.

use crate::device_scanner::{first_adapter, peripheral_key};
use crate::error::{ConnectionError, ScanError};
use crate::probe::{self, Reading};
use crate::telemetry::BatterySnapshot;
use btleplug::api::{
    CentralEvent, CharPropFlags, Central, Characteristic, Peripheral as _, ScanFilter,
};
use btleplug::platform::{Adapter, Peripheral};
use futures_util::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

/// How often the stop flag is polled
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Status(ConnectionStatus),
    /// Complete replacement of the telemetry shown
    Snapshot(BatterySnapshot),
    /// Partial update decoded from a single characteristic
    Reading(Reading),
    /// Entry for the user-visible event log
    Event(String),
    /// Entry for the Bluetooth debug log
    Debug(String),
}

/// Identifies one Bluetooth or simulated session; increases monotonically
pub type SessionId = u64;

/// An update together with the session that produced it
#[derive(Debug, Clone)]
pub struct SessionMessage {
    pub session: SessionId,
    pub update: SessionUpdate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connecting,
    Connected { name: String },
    Disconnected,
    Error(String),
}

/// Cloneable send side handed to session tasks
#[derive(Clone)]
pub struct Reporter {
    sender: Sender<SessionMessage>,
    session: SessionId,
}

impl Reporter {
    pub fn new(sender: Sender<SessionMessage>) -> Self {
        Self { sender, session: 0 }
    }

    /// Same channel, stamping updates with `session`
    pub fn for_session(&self, session: SessionId) -> Self {
        Self {
            sender: self.sender.clone(),
            session,
        }
    }

    pub fn send(&self, update: SessionUpdate) {
        let message = SessionMessage {
            session: self.session,
            update,
        };
        if let Err(why) = self.sender.send(message) {
            log::warn!("UI is gone, dropping update: {:?}", why.0);
        }
    }

    pub fn status(&self, status: ConnectionStatus) {
        self.send(SessionUpdate::Status(status));
    }

    pub fn event(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.send(SessionUpdate::Event(message));
    }

    pub fn debug(&self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}", message);
        self.send(SessionUpdate::Debug(message));
    }

    fn error(&self, error: ConnectionError) {
        log::error!("{}", error);
        self.debug(format!("Connection error: {}", error));
        self.status(ConnectionStatus::Error(error.to_string()));
    }
}

async fn find_peripheral(
    adapter: &Adapter,
    device_id: &str,
    scan_window: Duration,
) -> Result<Peripheral, ConnectionError> {
    let lookup = |peripherals: Vec<Peripheral>| {
        peripherals
            .into_iter()
            .find(|p| peripheral_key(p) == device_id)
    };

    let connection_error = |e: btleplug::Error| ConnectionError::DeviceConnection {
        device_id: device_id.to_string(),
        reason: e.to_string(),
    };

    // The adapter usually still knows the device from the scan
    if let Some(peripheral) = lookup(adapter.peripherals().await.map_err(connection_error)?) {
        return Ok(peripheral);
    }

    adapter
        .start_scan(ScanFilter::default())
        .await
        .map_err(connection_error)?;
    tokio::time::sleep(scan_window).await;
    adapter.stop_scan().await.map_err(connection_error)?;

    lookup(adapter.peripherals().await.map_err(connection_error)?)
        .ok_or_else(|| ConnectionError::DeviceNotFound(device_id.to_string()))
}

async fn connect_to_device(
    adapter: &Adapter,
    device_id: &str,
    scan_window: Duration,
    reporter: &Reporter,
) -> Result<Peripheral, ConnectionError> {
    let peripheral = find_peripheral(adapter, device_id, scan_window).await?;

    reporter.debug("Connecting to GATT server...");
    peripheral
        .connect()
        .await
        .map_err(|e| ConnectionError::DeviceConnection {
            device_id: device_id.to_string(),
            reason: e.to_string(),
        })?;
    reporter.debug("Connected to GATT server");

    reporter.debug("Discovering services...");
    if let Err(e) = peripheral.discover_services().await {
        release(&peripheral, reporter).await;
        return Err(ConnectionError::DeviceConnection {
            device_id: device_id.to_string(),
            reason: e.to_string(),
        });
    }

    Ok(peripheral)
}

/// The part of a peripheral needed to tear a connection down
trait Link {
    async fn is_connected(&self) -> Result<bool, btleplug::Error>;
    async fn disconnect(&self) -> Result<(), btleplug::Error>;
}

impl Link for Peripheral {
    async fn is_connected(&self) -> Result<bool, btleplug::Error> {
        btleplug::api::Peripheral::is_connected(self).await
    }

    async fn disconnect(&self) -> Result<(), btleplug::Error> {
        btleplug::api::Peripheral::disconnect(self).await
    }
}

/// Best-effort disconnect; failures are logged, never propagated
async fn release<L: Link>(link: &L, reporter: &Reporter) {
    if !link.is_connected().await.unwrap_or(false) {
        return;
    }
    if let Err(e) = link.disconnect().await {
        log::warn!("Failed to disconnect from battery: {}", e);
        reporter.debug(format!("Disconnect failed: {}", e));
    }
}

/// Ends a session the user cancelled before it was fully up
async fn abandon<L: Link>(link: &L, reporter: &Reporter) {
    log::info!("{}", ConnectionError::Interrupted);
    reporter.debug(ConnectionError::Interrupted.to_string());
    release(link, reporter).await;
    reporter.status(ConnectionStatus::Disconnected);
}

/// Interpret a characteristic value and forward what we understand
fn handle_value(reporter: &Reporter, characteristic: &uuid::Uuid, value: &[u8]) {
    if let Some(reading) = probe::decode(characteristic, value) {
        match reading {
            Reading::StateOfCharge(level) => reporter.debug(format!("Battery level: {}%", level)),
        }
        reporter.send(SessionUpdate::Reading(reading));
    }
}

async fn probe_characteristic(
    peripheral: &Peripheral,
    characteristic: &Characteristic,
    reporter: &Reporter,
) {
    reporter.debug(format!("  - Characteristic: {}", characteristic.uuid));

    if characteristic.properties.contains(CharPropFlags::READ) {
        match peripheral.read(characteristic).await {
            Ok(value) => {
                reporter.debug(format!("    Value: {}", probe::hex_dump(&value)));
                handle_value(reporter, &characteristic.uuid, &value);
            }
            Err(e) => reporter.debug(format!("    Could not read: {}", e)),
        }
    }

    let notifies = characteristic.properties.contains(CharPropFlags::NOTIFY)
        || characteristic.properties.contains(CharPropFlags::INDICATE);
    if notifies {
        match peripheral.subscribe(characteristic).await {
            Ok(()) => reporter.debug("    Notifications started"),
            Err(e) => reporter.debug(format!("    Could not start notifications: {}", e)),
        }
    }
}

async fn enumerate_services(peripheral: &Peripheral, reporter: &Reporter) {
    let services = peripheral.services();
    reporter.debug(format!("Found {} services", services.len()));

    for service in &services {
        match probe::service_name(&service.uuid) {
            Some(name) => reporter.debug(format!("Service: {} ({})", service.uuid, name)),
            None => reporter.debug(format!("Service: {}", service.uuid)),
        }

        for characteristic in &service.characteristics {
            probe_characteristic(peripheral, characteristic, reporter).await;
        }
    }
}

pub(crate) async fn wait_for_stop(should_stop: &Arc<AtomicBool>) {
    while !should_stop.load(Ordering::Relaxed) {
        tokio::time::sleep(STOP_POLL_INTERVAL).await;
    }
}

async fn run_event_loop(
    adapter: &Adapter,
    peripheral: &Peripheral,
    reporter: &Reporter,
    should_stop: &Arc<AtomicBool>,
) -> Result<(), btleplug::Error> {
    let mut notifications = peripheral.notifications().await?;
    let mut events = adapter.events().await?;
    let peripheral_id = peripheral.id();

    let stop = wait_for_stop(should_stop);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            Some(notification) = notifications.next() => {
                reporter.debug(format!(
                    "Notify {}: {}",
                    notification.uuid,
                    probe::hex_dump(&notification.value)
                ));
                handle_value(reporter, &notification.uuid, &notification.value);
            }
            Some(event) = events.next() => {
                if let CentralEvent::DeviceDisconnected(id) = event {
                    if id == peripheral_id {
                        reporter.debug("Device disconnected");
                        reporter.event("Disconnected from battery");
                        return Ok(());
                    }
                }
            }
            _ = &mut stop => {
                reporter.debug("Disconnecting...");
                release(peripheral, reporter).await;
                reporter.event("Disconnected from battery");
                return Ok(());
            }
        }
    }
}

/// Runs a full Bluetooth session. Always finishes with `Disconnected` or
/// `Error`.
pub async fn run_session(
    device_id: String,
    scan_window: Duration,
    reporter: Reporter,
    should_stop: Arc<AtomicBool>,
) {
    reporter.status(ConnectionStatus::Connecting);

    let adapter = match first_adapter().await {
        Ok(adapter) => adapter,
        Err(ScanError::NoAdapters) => {
            reporter.error(ConnectionError::NoAdapter);
            return;
        }
        Err(e) => {
            reporter.error(ConnectionError::DeviceConnection {
                device_id,
                reason: e.to_string(),
            });
            return;
        }
    };

    let peripheral = match connect_to_device(&adapter, &device_id, scan_window, &reporter).await {
        Ok(peripheral) => peripheral,
        Err(e) => {
            reporter.error(e);
            return;
        }
    };

    if should_stop.load(Ordering::Relaxed) {
        abandon(&peripheral, &reporter).await;
        return;
    }

    enumerate_services(&peripheral, &reporter).await;

    let name = match peripheral.properties().await {
        Ok(Some(props)) => props.local_name.unwrap_or_else(|| "Unknown Device".to_string()),
        _ => "Unknown Device".to_string(),
    };

    if should_stop.load(Ordering::Relaxed) {
        abandon(&peripheral, &reporter).await;
        return;
    }

    reporter.status(ConnectionStatus::Connected { name });
    reporter.event("Connected to battery");

    if let Err(e) = run_event_loop(&adapter, &peripheral, &reporter, &should_stop).await {
        log::error!("Battery session ended with error: {}", e);
        reporter.debug(format!("Session error: {}", e));
    }

    // The loop may have bailed out with the link still up
    release(&peripheral, &reporter).await;
    reporter.status(ConnectionStatus::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    fn updates(receiver: &mpsc::Receiver<SessionMessage>) -> Vec<SessionUpdate> {
        receiver.try_iter().map(|message| message.update).collect()
    }

    struct FakeLink {
        connected: bool,
        fail_disconnect: bool,
        disconnects: AtomicUsize,
    }

    impl FakeLink {
        fn new(connected: bool, fail_disconnect: bool) -> Self {
            Self {
                connected,
                fail_disconnect,
                disconnects: AtomicUsize::new(0),
            }
        }
    }

    impl Link for FakeLink {
        async fn is_connected(&self) -> Result<bool, btleplug::Error> {
            Ok(self.connected)
        }

        async fn disconnect(&self) -> Result<(), btleplug::Error> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            if self.fail_disconnect {
                Err(btleplug::Error::NotConnected)
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_battery_level_value_is_forwarded() {
        let (sender, receiver) = mpsc::channel();
        let reporter = Reporter::new(sender);

        handle_value(&reporter, &probe::BATTERY_LEVEL, &[64]);

        assert!(updates(&receiver)
            .iter()
            .any(|u| matches!(u, SessionUpdate::Reading(Reading::StateOfCharge(64)))));
    }

    #[test]
    fn test_unknown_value_is_not_forwarded() {
        let (sender, receiver) = mpsc::channel();
        let reporter = Reporter::new(sender);

        handle_value(&reporter, &probe::NORDIC_UART_SERVICE, &[0x01, 0x03, 0x00]);

        assert_eq!(receiver.try_iter().count(), 0);
    }

    #[test]
    fn test_reporter_survives_closed_channel() {
        let (sender, receiver) = mpsc::channel();
        drop(receiver);
        let reporter = Reporter::new(sender);
        reporter.event("Connected to battery");
    }

    #[test]
    fn test_connection_error_reports_status() {
        let (sender, receiver) = mpsc::channel();
        let reporter = Reporter::new(sender);

        reporter.error(ConnectionError::DeviceNotFound("dev".to_string()));

        assert!(matches!(
            updates(&receiver).last(),
            Some(SessionUpdate::Status(ConnectionStatus::Error(_)))
        ));
    }

    #[test]
    fn test_updates_carry_session_id() {
        let (sender, receiver) = mpsc::channel();
        let base = Reporter::new(sender);
        let reporter = base.for_session(7);

        base.event("from base");
        reporter.event("from session");

        let sessions: Vec<SessionId> = receiver.try_iter().map(|m| m.session).collect();
        assert_eq!(sessions, vec![0, 7]);
    }

    #[tokio::test]
    async fn test_release_disconnects_live_link() {
        let (sender, _receiver) = mpsc::channel();
        let link = FakeLink::new(true, false);

        release(&link, &Reporter::new(sender)).await;

        assert_eq!(link.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_skips_dropped_link() {
        let (sender, _receiver) = mpsc::channel();
        let link = FakeLink::new(false, false);

        release(&link, &Reporter::new(sender)).await;

        assert_eq!(link.disconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_disconnect_is_logged_not_propagated() {
        let (sender, receiver) = mpsc::channel();
        let link = FakeLink::new(true, true);

        release(&link, &Reporter::new(sender)).await;

        assert_eq!(link.disconnects.load(Ordering::SeqCst), 1);
        let failed = |u: &SessionUpdate| {
            matches!(u, SessionUpdate::Debug(line) if line.starts_with("Disconnect failed"))
        };
        assert!(updates(&receiver).iter().any(failed));
    }

    #[tokio::test]
    async fn test_cancelled_session_never_reports_connected_or_error() {
        let (sender, receiver) = mpsc::channel();
        let link = FakeLink::new(true, false);

        abandon(&link, &Reporter::new(sender)).await;

        let updates = updates(&receiver);
        assert_eq!(link.disconnects.load(Ordering::SeqCst), 1);
        assert!(!updates.iter().any(|u| matches!(
            u,
            SessionUpdate::Status(ConnectionStatus::Connected { .. } | ConnectionStatus::Error(_))
        )));
        assert!(matches!(
            updates.last(),
            Some(SessionUpdate::Status(ConnectionStatus::Disconnected))
        ));
    }
}
