//! Port abstraction layer for serial communication.
//!
//! Provides the `SerialBackend` seam with a real tokio-serial implementation
//! and a scriptable mock for tests.

pub mod async_port;
pub mod error;
pub mod mock;
pub mod traits;

pub use async_port::{SystemSerialBackend, TokioSerialPort};
pub use error::PortError;
pub use mock::{MockPortHandle, MockSerialBackend, MockSerialPort};
pub use traits::*;
