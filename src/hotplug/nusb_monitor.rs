//! `UsbMonitor` backed by nusb's device listing and hotplug watch.

use super::events::{HotplugEvent, UsbDevice, UsbMonitor};
use crate::error::HotplugError;
use async_trait::async_trait;
use futures::StreamExt;
use nusb::hotplug::{HotplugEvent as NusbEvent, HotplugWatch};

/// Watches the real USB bus.
pub struct NusbMonitor {
    watch: HotplugWatch,
}

impl NusbMonitor {
    /// Subscribe to hotplug notifications.
    ///
    /// Subscribe before scanning the present devices, or a device attached
    /// in between is missed by both.
    pub fn new() -> Result<Self, HotplugError> {
        let watch = nusb::watch_devices().map_err(HotplugError::Watch)?;
        Ok(Self { watch })
    }

    /// Snapshot of the attached USB devices.
    pub fn list_devices() -> Result<Vec<UsbDevice>, HotplugError> {
        let devices = nusb::list_devices().map_err(HotplugError::Enumerate)?;
        Ok(devices.map(|info| device_from(&info)).collect())
    }
}

fn device_from(info: &nusb::DeviceInfo) -> UsbDevice {
    UsbDevice {
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        serial_number: info.serial_number().map(str::to_string),
        product: info.product_string().map(str::to_string),
    }
}

#[async_trait]
impl UsbMonitor for NusbMonitor {
    fn present_devices(&self) -> Result<Vec<UsbDevice>, HotplugError> {
        Self::list_devices()
    }

    async fn next_event(&mut self) -> Option<HotplugEvent> {
        match self.watch.next().await? {
            NusbEvent::Connected(info) => Some(HotplugEvent::Attached(device_from(&info))),
            NusbEvent::Disconnected(_) => Some(HotplugEvent::Detached),
        }
    }
}

impl std::fmt::Debug for NusbMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NusbMonitor").finish_non_exhaustive()
    }
}
