//! Routes hotplug notifications to the connection manager.

use super::events::{HotplugEvent, UsbDevice, UsbMonitor};
use crate::connection::ConnectionManager;
use crate::error::HotplugError;
use crate::identity::DeviceIdentity;
use tracing::{debug, info, warn};

/// Starts the connection when the watched device attaches and stops it on
/// any detach.
pub struct HotplugDispatcher<M> {
    identity: DeviceIdentity,
    manager: ConnectionManager,
    monitor: M,
}

impl<M: UsbMonitor> HotplugDispatcher<M> {
    pub fn new(identity: DeviceIdentity, manager: ConnectionManager, monitor: M) -> Self {
        Self {
            identity,
            manager,
            monitor,
        }
    }

    fn is_target(&self, device: &UsbDevice) -> bool {
        device
            .serial_number
            .as_deref()
            .is_some_and(|sn| self.identity.matches(sn))
    }

    /// Start a connection if the device is already attached.
    ///
    /// Returns whether a matching device was found.
    pub fn initial_scan(&self) -> Result<bool, HotplugError> {
        let devices = self.monitor.present_devices()?;
        debug!(count = devices.len(), "Scanned present USB devices");

        match devices.iter().find(|d| self.is_target(d)) {
            Some(device) => {
                info!(device = %device, "Target device already attached");
                self.manager.spawn_start(self.identity.clone());
                Ok(true)
            }
            None => {
                info!(identity = %self.identity, "Waiting for target device to attach");
                Ok(false)
            }
        }
    }

    /// Handle one notification.
    ///
    /// Starts run in the background so a later detach can cancel them; a
    /// detach is awaited so events stay ordered.
    pub async fn dispatch(&self, event: HotplugEvent) {
        match event {
            HotplugEvent::Attached(device) if self.is_target(&device) => {
                info!(device = %device, "Target device attached");
                self.manager.spawn_start(self.identity.clone());
            }
            HotplugEvent::Attached(device) => {
                debug!(device = %device, "Ignoring unrelated USB device");
            }
            HotplugEvent::Detached => {
                debug!("USB device detached");
                self.manager.stop().await;
            }
        }
    }

    /// Scan, then dispatch events until the monitor shuts down.
    pub async fn run(mut self) {
        if let Err(e) = self.initial_scan() {
            warn!("Initial USB scan failed: {e}");
        }

        while let Some(event) = self.monitor.next_event().await {
            self.dispatch(event).await;
        }
        info!("USB hotplug stream ended");
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }
}
