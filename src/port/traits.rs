//! Core traits for serial port abstraction.
//!
//! `SerialBackend` is the seam between the connection logic and the OS: it
//! lists the visible ports and opens one. Both the real backend and the mock
//! implement it, so the connection manager never touches `serialport` directly.

use super::error::PortError;
use async_trait::async_trait;
use std::time::Duration;

/// Baud rate used for every connection.
pub const BAUD_RATE: u32 = 9600;

/// Line settings handed to `SerialBackend::open`.
///
/// The device always talks 9600 8N1 without flow control; the struct only
/// carries those values to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    /// Driver-level read timeout.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
            timeout: Duration::from_secs(1),
        }
    }
}

/// A serial port visible to the OS right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// OS-level locator, e.g. `/dev/ttyACM0` or `COM4`.
    pub path: String,
    /// USB serial number of the device behind the port, when it has one.
    pub serial_number: Option<String>,
}

impl PortInfo {
    pub fn new(path: impl Into<String>, serial_number: Option<&str>) -> Self {
        Self {
            path: path.into(),
            serial_number: serial_number.map(str::to_string),
        }
    }
}

/// Async read side of an open serial port.
///
/// Dropping the adapter closes the underlying port.
#[async_trait]
pub trait AsyncSerialPortAdapter: Send + std::fmt::Debug {
    /// Read bytes from the port into `buffer`.
    ///
    /// Returns `Ok(0)` when the port reached end of stream (device gone).
    async fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;
}

/// Source of serial ports: enumeration plus explicit open.
#[async_trait]
pub trait SerialBackend: Send + Sync {
    /// List the serial ports currently visible to the OS.
    fn available_ports(&self) -> Result<Vec<PortInfo>, PortError>;

    /// Open the port at `path`. The port is never opened implicitly.
    async fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn AsyncSerialPortAdapter>, PortError>;
}
