//! Port-specific error types.
//!
//! Kept separate from connection-level errors so the backends stay ignorant
//! of retry and session semantics.

use thiserror::Error;

/// Errors that can occur while enumerating, opening or reading serial ports.
#[derive(Debug, Error)]
pub enum PortError {
    /// The serial device file or port name does not exist.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration was rejected by the OS driver.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Enumerating the visible ports failed.
    #[error("Port enumeration failed: {0}")]
    Enumeration(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether a read failure should be retried rather than ending the session.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}
