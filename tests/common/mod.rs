//! Shared test utilities for the serial-watch test suites.
//!
//! Builds a connection manager over the mock serial backend and an in-memory
//! sink, with retry bounds small enough for paused-clock tests.

#![allow(dead_code)]

use serial_watch::connection::{ConnectionManager, ConnectionSettings};
use serial_watch::identity::DeviceIdentity;
use serial_watch::port::MockSerialBackend;
use serial_watch::reader::MemorySink;
use serial_watch::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Serial number used by most scenarios.
pub const SERIAL: &str = "SN123";

/// Path the mock backend exposes for [`SERIAL`].
pub const PATH: &str = "/dev/ttyX";

/// Settings with a short settle delay and a handful of retries.
pub fn test_settings() -> ConnectionSettings {
    ConnectionSettings {
        settle_delay: Duration::from_millis(100),
        resolve_policy: RetryPolicy::new(5, Duration::from_millis(100)),
        open_policy: RetryPolicy::new(5, Duration::from_millis(500)),
        ..ConnectionSettings::default()
    }
}

/// Everything a scenario needs to drive and observe one manager.
pub struct Harness {
    pub backend: MockSerialBackend,
    pub sink: MemorySink,
    pub manager: ConnectionManager,
    pub identity: DeviceIdentity,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: ConnectionSettings) -> Self {
        let backend = MockSerialBackend::new();
        let sink = MemorySink::new();
        let manager = ConnectionManager::new(Arc::new(backend.clone()), Arc::new(sink.clone()))
            .with_settings(settings);

        Self {
            backend,
            sink,
            manager,
            identity: DeviceIdentity::new(SERIAL),
        }
    }

    /// Harness whose device is already visible at [`PATH`].
    pub fn with_device() -> Self {
        let harness = Self::new();
        harness.backend.add_port(PATH, SERIAL);
        harness
    }
}

/// Let spawned tasks run; the clock auto-advances under `start_paused`.
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
