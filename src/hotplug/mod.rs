//! USB hotplug detection.
//!
//! Event-driven device detection through `nusb::watch_devices()`, filtered by
//! serial number and forwarded to the connection manager.

pub mod dispatcher;
pub mod events;
pub mod mock;
pub mod nusb_monitor;

pub use dispatcher::HotplugDispatcher;
pub use events::{HotplugEvent, UsbDevice, UsbMonitor};
pub use mock::{MockUsbController, MockUsbMonitor};
pub use nusb_monitor::NusbMonitor;
