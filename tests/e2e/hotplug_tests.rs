//! Hotplug E2E tests: attach -> start, detach -> stop
//!
//! The dispatcher runs on the test task alongside a scripted USB bus; dropping
//! the controller ends the event stream and with it `run()`.

use crate::common::{settle, Harness, PATH, SERIAL};
use pretty_assertions::assert_eq;
use serial_watch::connection::ConnectionState;
use serial_watch::hotplug::{HotplugDispatcher, MockUsbMonitor, UsbDevice};

#[tokio::test(start_paused = true)]
async fn test_device_present_at_startup_is_connected() {
    let h = Harness::with_device();
    let (monitor, controller) = MockUsbMonitor::new();
    controller.add_present(UsbDevice::with_serial(SERIAL));

    let dispatcher = HotplugDispatcher::new(h.identity.clone(), h.manager.clone(), monitor);
    let script = async move {
        settle(200).await;
        let port = h.backend.last_opened().unwrap();
        port.push_bytes(b"boot\n");
        settle(10).await;
        assert_eq!(h.sink.contents(), "boot\r\n");
        assert_eq!(h.manager.connected_path().as_deref(), Some(PATH));
        drop(controller);
    };

    tokio::join!(dispatcher.run(), script);
}

#[tokio::test(start_paused = true)]
async fn test_attach_connects_and_detach_disconnects() {
    let h = Harness::with_device();
    let (monitor, controller) = MockUsbMonitor::new();
    let manager = h.manager.clone();

    let dispatcher = HotplugDispatcher::new(h.identity.clone(), h.manager.clone(), monitor);
    let script = async move {
        settle(10).await;
        assert_eq!(manager.state(), ConnectionState::Idle);

        controller.attach(UsbDevice::with_serial(SERIAL));
        settle(200).await;
        let port = h.backend.last_opened().unwrap();
        assert!(!port.is_closed());

        controller.detach(SERIAL);
        settle(10).await;
        assert!(port.is_closed());
        assert_eq!(manager.state(), ConnectionState::Idle);
    };

    tokio::join!(dispatcher.run(), script);
}

#[tokio::test(start_paused = true)]
async fn test_detach_during_lookup_then_reattach_starts_fresh() {
    let h = Harness::new();
    let (monitor, controller) = MockUsbMonitor::new();
    let manager = h.manager.clone();
    let backend = h.backend.clone();

    let dispatcher = HotplugDispatcher::new(h.identity.clone(), h.manager.clone(), monitor);
    let script = async move {
        // Port node not created yet: the start keeps looking.
        controller.attach(UsbDevice::with_serial(SERIAL));
        settle(150).await;
        assert_eq!(manager.state(), ConnectionState::ResolvingPath);

        controller.detach(SERIAL);
        settle(10).await;
        assert_eq!(manager.state(), ConnectionState::Idle);

        backend.add_port(PATH, SERIAL);
        controller.attach(UsbDevice::with_serial(SERIAL));
        settle(200).await;

        assert_eq!(manager.connections_opened(), 1);
        assert_eq!(backend.open_attempts(), vec![PATH.to_string()]);
        assert_eq!(manager.connected_path().as_deref(), Some(PATH));
    };

    tokio::join!(dispatcher.run(), script);
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_detach_still_tears_down() {
    let h = Harness::with_device();
    let (monitor, controller) = MockUsbMonitor::new();
    controller.add_present(UsbDevice::with_serial(SERIAL));
    controller.add_present(UsbDevice::with_serial("KEYBOARD"));
    let manager = h.manager.clone();

    let dispatcher = HotplugDispatcher::new(h.identity.clone(), h.manager.clone(), monitor);
    let script = async move {
        settle(200).await;
        assert_eq!(manager.connected_path().as_deref(), Some(PATH));

        // Detach notifications carry no identity, so any detach stops.
        controller.detach("KEYBOARD");
        settle(10).await;
        assert_eq!(manager.connected_path(), None);
    };

    tokio::join!(dispatcher.run(), script);
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_attach_is_ignored() {
    let h = Harness::with_device();
    let (monitor, controller) = MockUsbMonitor::new();
    let manager = h.manager.clone();
    let backend = h.backend.clone();

    let dispatcher = HotplugDispatcher::new(h.identity.clone(), h.manager.clone(), monitor);
    let script = async move {
        controller.attach(UsbDevice::with_serial("SOMETHING-ELSE"));
        controller.attach(UsbDevice::default());
        settle(500).await;

        assert_eq!(manager.state(), ConnectionState::Idle);
        assert!(backend.open_attempts().is_empty());
    };

    tokio::join!(dispatcher.run(), script);
}
