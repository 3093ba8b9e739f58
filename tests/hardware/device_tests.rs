//! Resolve, open and read from the real device.

use super::test_identity;
use serial_watch::connection::{ConnectionManager, ConnectionState, StartOutcome};
use serial_watch::hotplug::NusbMonitor;
use serial_watch::port::{SerialBackend, SystemSerialBackend};
use serial_watch::reader::MemorySink;
use serial_watch::resolver::SerialPathResolver;
use std::sync::Arc;
use std::time::Duration;

#[test]
#[ignore]
fn test_device_visible_on_usb_bus() {
    let Some(identity) = test_identity() else {
        return;
    };

    let devices = NusbMonitor::list_devices().expect("USB enumeration failed");
    let found = devices
        .iter()
        .filter_map(|d| d.serial_number.as_deref())
        .any(|sn| identity.matches(sn));
    assert!(found, "{identity} not among {} USB devices", devices.len());
}

#[test]
#[ignore]
fn test_resolves_serial_path() {
    let Some(identity) = test_identity() else {
        return;
    };

    let backend = SystemSerialBackend::new();
    let ports = backend.available_ports().expect("serial enumeration failed");
    println!("Visible serial ports: {ports:?}");

    let resolver = SerialPathResolver::new(Arc::new(backend));
    let path = resolver.resolve(&identity).expect("device not resolved");
    println!("{identity} -> {path}");
}

#[tokio::test]
#[ignore]
async fn test_connects_and_streams() {
    let Some(identity) = test_identity() else {
        return;
    };

    let sink = MemorySink::new();
    let manager =
        ConnectionManager::new(Arc::new(SystemSerialBackend::new()), Arc::new(sink.clone()));

    let outcome = manager.start(&identity).await.expect("start failed");
    let StartOutcome::Connected { path } = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert_eq!(manager.state(), ConnectionState::Open { path });

    tokio::time::sleep(Duration::from_secs(3)).await;
    println!("Received {} bytes: {:?}", sink.contents().len(), sink.contents());

    manager.stop().await;
    assert_eq!(manager.state(), ConnectionState::Idle);
}
