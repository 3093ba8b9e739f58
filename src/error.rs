use crate::config::ConfigError;
use crate::port::PortError;
use crate::retry::RetryableError;
use thiserror::Error;

/// Failures of a start sequence.
///
/// None of these ever escape to the process: the connection manager logs
/// them and keeps waiting for the next hotplug event.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No visible serial port reports the wanted serial number.
    #[error("No serial path found for {identity}")]
    PathNotFound { identity: String },

    /// Listing the visible serial ports failed.
    #[error("Could not enumerate serial ports: {0}")]
    Enumeration(#[source] PortError),

    /// The OS refused to open the port.
    #[error("Failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: PortError,
    },

    /// A connection is already open on a different path.
    #[error("Refusing to open {requested}: a connection is already open at {open}")]
    ConflictingConnection { open: String, requested: String },

    /// The previous connection is still being torn down.
    #[error("Connection at {path} is still closing")]
    Closing { path: String },

    /// The start sequence was superseded by a newer start or a stop.
    #[error("Start sequence cancelled")]
    Cancelled,
}

impl RetryableError for ConnectionError {
    fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::ConflictingConnection { .. } | Self::Cancelled
        )
    }
}

/// Failures of the USB hotplug layer.
#[derive(Debug, Error)]
pub enum HotplugError {
    #[error("Failed to enumerate USB devices: {0}")]
    Enumerate(#[source] std::io::Error),

    #[error("Failed to subscribe to USB hotplug events: {0}")]
    Watch(#[source] std::io::Error),
}

/// Startup failures of the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Hotplug(#[from] HotplugError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}
