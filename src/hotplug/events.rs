//! Hotplug event types and the `UsbMonitor` seam.

use crate::error::HotplugError;
use async_trait::async_trait;
use std::fmt;

/// A USB device as seen by the hotplug layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsbDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    pub product: Option<String>,
}

impl UsbDevice {
    /// Device reporting only a serial number.
    pub fn with_serial(serial_number: impl Into<String>) -> Self {
        Self {
            serial_number: Some(serial_number.into()),
            ..Self::default()
        }
    }
}

impl fmt::Display for UsbDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)?;
        if let Some(product) = &self.product {
            write!(f, " {product}")?;
        }
        if let Some(serial) = &self.serial_number {
            write!(f, " (serial {serial})")?;
        }
        Ok(())
    }
}

/// OS notification about the USB bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugEvent {
    Attached(UsbDevice),
    /// Detach notifications carry no identity.
    Detached,
}

/// Source of USB device listings and hotplug notifications.
#[async_trait]
pub trait UsbMonitor: Send {
    /// Devices attached right now.
    fn present_devices(&self) -> Result<Vec<UsbDevice>, HotplugError>;

    /// Next notification in the order the OS emitted it; `None` once the
    /// source has shut down.
    async fn next_event(&mut self) -> Option<HotplugEvent>;
}
