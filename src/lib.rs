//! Serial Watch Library
//!
//! Watches the USB bus for one device, identified by its USB serial number,
//! and streams whatever it sends over its serial port to stdout. The
//! connection is opened when the device attaches and torn down when it
//! detaches or the stream fails.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `connection`: Connection lifecycle and the start/stop state machine
//! - `error`: Error types
//! - `hotplug`: USB attach/detach notifications
//! - `identity`: Device identity matching
//! - `logging`: Tracing subscriber setup
//! - `port`: Port abstraction layer for serial communication
//! - `reader`: Stream reader and output sink
//! - `resolver`: Serial number to device path lookup
//! - `retry`: Bounded, cancellable retries

pub mod config;
pub mod connection;
pub mod error;
pub mod hotplug;
pub mod identity;
pub mod logging;
pub mod port;
pub mod reader;
pub mod resolver;
pub mod retry;

// Re-export commonly used types for convenience
pub use connection::{
    CloseEvent, ConnectionEvent, ConnectionManager, ConnectionSettings, ConnectionState,
    StartOutcome,
};
pub use error::{AppError, ConnectionError, HotplugError};
pub use hotplug::{HotplugDispatcher, HotplugEvent, NusbMonitor, UsbDevice, UsbMonitor};
pub use identity::DeviceIdentity;
pub use port::{
    MockSerialBackend, PortConfiguration, PortError, PortInfo, SerialBackend,
    SystemSerialBackend,
};
pub use reader::{MemorySink, OutputSink, StdoutSink, StreamReader};
pub use resolver::SerialPathResolver;
pub use retry::{retry, Delay, RetryError, RetryPolicy, TokioDelay};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
