//! Mock serial backend for testing.
//!
//! `MockSerialBackend` scripts which ports are visible and how opens behave.
//! Every successful open yields a `MockSerialPort` for the connection manager
//! and a `MockPortHandle` for the test, through which the test feeds bytes,
//! injects errors or hangs up, and observes whether the port was closed.

use super::error::PortError;
use super::traits::{AsyncSerialPortAdapter, PortConfiguration, PortInfo, SerialBackend};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One scripted event delivered to a mock port reader.
#[derive(Debug)]
enum MockFrame {
    Data(Vec<u8>),
    Error(std::io::ErrorKind, String),
    HangUp,
}

/// Mock serial port returned by `MockSerialBackend::open`.
pub struct MockSerialPort {
    name: String,
    frames: mpsc::UnboundedReceiver<MockFrame>,
    pending: VecDeque<u8>,
    closed: Arc<AtomicBool>,
}

/// Test-side handle to a port the mock backend opened.
#[derive(Debug, Clone)]
pub struct MockPortHandle {
    name: String,
    frames: mpsc::UnboundedSender<MockFrame>,
    closed: Arc<AtomicBool>,
}

impl MockPortHandle {
    /// Name/path the port was opened at.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make `data` available to the reader.
    pub fn push_bytes(&self, data: &[u8]) {
        let _ = self.frames.send(MockFrame::Data(data.to_vec()));
    }

    /// Fail the next read with an I/O error of the given kind.
    pub fn fail(&self, kind: std::io::ErrorKind, message: impl Into<String>) {
        let _ = self.frames.send(MockFrame::Error(kind, message.into()));
    }

    /// Simulate the device vanishing: the next read reports end of stream.
    pub fn hang_up(&self) {
        let _ = self.frames.send(MockFrame::HangUp);
    }

    /// Whether the connection side dropped (closed) the port.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl MockSerialPort {
    fn new(name: &str) -> (Self, MockPortHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let port = Self {
            name: name.to_string(),
            frames: rx,
            pending: VecDeque::new(),
            closed: Arc::clone(&closed),
        };
        let handle = MockPortHandle {
            name: name.to_string(),
            frames: tx,
            closed,
        };
        (port, handle)
    }

    fn drain_into(&mut self, buffer: &mut [u8]) -> usize {
        let mut n = 0;
        for slot in buffer.iter_mut() {
            match self.pending.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

#[async_trait]
impl AsyncSerialPortAdapter for MockSerialPort {
    async fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        if buffer.is_empty() {
            return Ok(0);
        }
        loop {
            if !self.pending.is_empty() {
                return Ok(self.drain_into(buffer));
            }
            match self.frames.recv().await {
                Some(MockFrame::Data(data)) => self.pending.extend(data),
                Some(MockFrame::Error(kind, message)) => {
                    return Err(PortError::Io(std::io::Error::new(kind, message)))
                }
                Some(MockFrame::HangUp) | None => return Ok(0),
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[derive(Debug, Default)]
struct MockBackendState {
    ports: Vec<PortInfo>,
    list_failures: u32,
    open_failures: HashMap<String, u32>,
    open_attempts: Vec<String>,
    opened: Vec<MockPortHandle>,
}

/// Scriptable in-memory `SerialBackend`.
///
/// Cloning shares the same script, so a test can keep a clone while the
/// connection manager owns another.
#[derive(Debug, Clone, Default)]
pub struct MockSerialBackend {
    state: Arc<Mutex<MockBackendState>>,
}

impl MockSerialBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a port visible at `path` for a device with `serial_number`.
    pub fn add_port(&self, path: &str, serial_number: &str) {
        self.state
            .lock()
            .ports
            .push(PortInfo::new(path, Some(serial_number)));
    }

    /// Make a port visible that reports no serial number.
    pub fn add_anonymous_port(&self, path: &str) {
        self.state.lock().ports.push(PortInfo::new(path, None));
    }

    /// Remove every visible port at `path`.
    pub fn remove_port(&self, path: &str) {
        self.state.lock().ports.retain(|p| p.path != path);
    }

    /// Fail the next `count` enumerations.
    pub fn fail_listing(&self, count: u32) {
        self.state.lock().list_failures = count;
    }

    /// Fail the next `count` open attempts on `path`.
    pub fn fail_opens(&self, path: &str, count: u32) {
        self.state.lock().open_failures.insert(path.to_string(), count);
    }

    /// Every path an open was attempted on, in order.
    pub fn open_attempts(&self) -> Vec<String> {
        self.state.lock().open_attempts.clone()
    }

    /// Handle of the most recently opened port.
    pub fn last_opened(&self) -> Option<MockPortHandle> {
        self.state.lock().opened.last().cloned()
    }
}

#[async_trait]
impl SerialBackend for MockSerialBackend {
    fn available_ports(&self) -> Result<Vec<PortInfo>, PortError> {
        let mut state = self.state.lock();
        if state.list_failures > 0 {
            state.list_failures -= 1;
            return Err(PortError::Enumeration("mock enumeration failure".into()));
        }
        Ok(state.ports.clone())
    }

    async fn open(
        &self,
        path: &str,
        _config: &PortConfiguration,
    ) -> Result<Box<dyn AsyncSerialPortAdapter>, PortError> {
        let mut state = self.state.lock();
        state.open_attempts.push(path.to_string());

        if let Some(remaining) = state.open_failures.get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PortError::Io(std::io::Error::other(format!(
                    "{path} is busy"
                ))));
            }
        }

        if !state.ports.iter().any(|p| p.path == path) {
            return Err(PortError::not_found(path));
        }

        let (port, handle) = MockSerialPort::new(path);
        state.opened.push(handle);
        Ok(Box::new(port))
    }
}
