//! System serial backend using `serialport` for enumeration and
//! `tokio-serial` for async I/O.

use super::error::PortError;
use super::traits::{AsyncSerialPortAdapter, PortConfiguration, PortInfo, SerialBackend};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;

/// Native async serial port backed by a `tokio_serial::SerialStream`.
pub struct TokioSerialPort {
    inner: tokio_serial::SerialStream,
    name: String,
}

impl TokioSerialPort {
    /// Open a serial port with async I/O support.
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let builder = tokio_serial::new(port_name, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(config.timeout);

        let inner = tokio_serial::SerialStream::open(&builder).map_err(|e| match e.kind() {
            tokio_serial::ErrorKind::NoDevice => PortError::not_found(port_name),
            tokio_serial::ErrorKind::InvalidInput => PortError::config(e.to_string()),
            _ => PortError::Serial(e),
        })?;

        Ok(Self {
            inner,
            name: port_name.to_string(),
        })
    }
}

#[async_trait]
impl AsyncSerialPortAdapter for TokioSerialPort {
    async fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.inner.read(buffer).await.map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for TokioSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSerialPort")
            .field("name", &self.name)
            .finish()
    }
}

/// Backend talking to the real OS serial subsystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerialBackend;

impl SystemSerialBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Only USB ports carry a serial number; everything else is listed without one.
fn port_info_from(info: serialport::SerialPortInfo) -> PortInfo {
    let serial_number = match info.port_type {
        serialport::SerialPortType::UsbPort(usb) => usb.serial_number,
        _ => None,
    };
    PortInfo {
        path: info.port_name,
        serial_number,
    }
}

#[async_trait]
impl SerialBackend for SystemSerialBackend {
    fn available_ports(&self) -> Result<Vec<PortInfo>, PortError> {
        let ports = serialport::available_ports()
            .map_err(|e| PortError::Enumeration(e.to_string()))?;
        Ok(ports.into_iter().map(port_info_from).collect())
    }

    async fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn AsyncSerialPortAdapter>, PortError> {
        let port = TokioSerialPort::open(path, config)?;
        Ok(Box::new(port))
    }
}
