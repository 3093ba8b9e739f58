//! Configuration schema definitions.
//!
//! All sections default sensibly, so an empty or missing file is valid.

use crate::connection::ConnectionSettings;
use crate::identity::{DeviceIdentity, DEFAULT_SERIAL_NUMBER};
use crate::port::PortConfiguration;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which device to watch
    pub device: DeviceConfig,
    /// Retry bounds for the start sequence
    pub retry: RetryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Identity of the watched device.
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.device.serial_number.trim())
    }

    /// Connection tunables derived from this configuration.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            settle_delay: self.device.settle_delay(),
            resolve_policy: self.retry.resolve_policy(),
            open_policy: self.retry.open_policy(),
            port: PortConfiguration::default(),
        }
    }
}

/// Device section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// USB serial number, matched case-insensitively
    pub serial_number: String,
    /// Wait after an attach before looking for the serial port
    pub settle_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial_number: DEFAULT_SERIAL_NUMBER.to_string(),
            settle_delay_ms: 1000,
        }
    }
}

impl DeviceConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Retry section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Path lookups per start
    pub resolve_attempts: u32,
    pub resolve_delay_ms: u64,
    /// Open attempts per start
    pub open_attempts: u32,
    pub open_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            resolve_attempts: RetryPolicy::PATH_RESOLUTION.max_attempts,
            resolve_delay_ms: 1000,
            open_attempts: RetryPolicy::PORT_OPEN.max_attempts,
            open_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    pub fn resolve_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.resolve_attempts,
            Duration::from_millis(self.resolve_delay_ms),
        )
    }

    pub fn open_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.open_attempts, Duration::from_millis(self.open_delay_ms))
    }
}

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Full,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Timestamp, level, target and fields
    #[default]
    Full,
    /// Single-line, abbreviated
    Compact,
}
