//! Device identity: the USB serial number of the device being watched.

use std::fmt;
use std::str::FromStr;

/// Serial number watched when neither the CLI nor the config names one.
pub const DEFAULT_SERIAL_NUMBER: &str = "0240000030514E45004520067D7E00471F91000097969900";

/// Hardware serial number of the target device.
///
/// Comparisons are case-insensitive: the OS and the USB stack do not agree
/// on the case of hex digits in serial numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self(serial_number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive match against a serial number reported by the OS.
    pub fn matches(&self, serial_number: &str) -> bool {
        self.0.to_lowercase() == serial_number.to_lowercase()
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_SERIAL_NUMBER)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("serial number must not be empty".to_string());
        }
        Ok(Self::new(trimmed))
    }
}
