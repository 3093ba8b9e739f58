//! Tests against a real device.
//!
//! The device is named by `SERIAL_WATCH_TEST_SERIAL`; every test skips with a
//! message when it is unset.

pub mod device_tests;

use serial_watch::identity::DeviceIdentity;

/// Identity of the attached test device, if configured.
pub fn test_identity() -> Option<DeviceIdentity> {
    match std::env::var("SERIAL_WATCH_TEST_SERIAL") {
        Ok(serial) if !serial.trim().is_empty() => Some(DeviceIdentity::new(serial.trim())),
        _ => {
            eprintln!("SERIAL_WATCH_TEST_SERIAL not set, skipping");
            None
        }
    }
}
