//! Channel-driven `UsbMonitor` for tests.

use super::events::{HotplugEvent, UsbDevice, UsbMonitor};
use crate::error::HotplugError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Monitor half, handed to the dispatcher.
#[derive(Debug)]
pub struct MockUsbMonitor {
    devices: Arc<Mutex<Vec<UsbDevice>>>,
    events: mpsc::UnboundedReceiver<HotplugEvent>,
}

/// Test half: plugs and unplugs devices.
///
/// Dropping every controller ends the event stream.
#[derive(Debug, Clone)]
pub struct MockUsbController {
    devices: Arc<Mutex<Vec<UsbDevice>>>,
    events: mpsc::UnboundedSender<HotplugEvent>,
}

impl MockUsbMonitor {
    pub fn new() -> (Self, MockUsbController) {
        let devices = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                devices: Arc::clone(&devices),
                events: rx,
            },
            MockUsbController {
                devices,
                events: tx,
            },
        )
    }
}

impl MockUsbController {
    /// Device already attached before monitoring starts; no event is sent.
    pub fn add_present(&self, device: UsbDevice) {
        self.devices.lock().push(device);
    }

    pub fn attach(&self, device: UsbDevice) {
        self.devices.lock().push(device.clone());
        let _ = self.events.send(HotplugEvent::Attached(device));
    }

    /// Unplug the device with `serial_number` and announce a detach.
    pub fn detach(&self, serial_number: &str) {
        self.devices
            .lock()
            .retain(|d| d.serial_number.as_deref() != Some(serial_number));
        let _ = self.events.send(HotplugEvent::Detached);
    }
}

#[async_trait]
impl UsbMonitor for MockUsbMonitor {
    fn present_devices(&self) -> Result<Vec<UsbDevice>, HotplugError> {
        Ok(self.devices.lock().clone())
    }

    async fn next_event(&mut self) -> Option<HotplugEvent> {
        self.events.recv().await
    }
}
