//! Connection lifecycle: the manager that owns the single serial connection
//! and the state/event types describing it.

pub mod manager;
pub mod state;

pub use manager::{ConnectionManager, ConnectionSettings, DEFAULT_SETTLE_DELAY};
pub use state::{CloseEvent, ConnectionEvent, ConnectionState, StartOutcome};
