//! Connection lifecycle states and the events that drive them.

use std::fmt;

/// Observable state of the connection manager.
///
/// ```text
///            start                 path found             open ok
///   Idle ──────────> ResolvingPath ──────────> Opening ──────────> Open
///    ^                    │                       │                 │
///    │     exhausted /    │                       │    stop / close │
///    │     cancelled      │                       │        / error  v
///    └────────────────────┴───────────────────────┴───────── TearingDown
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no start sequence in flight.
    Idle,
    /// A start sequence is settling or looking up the serial path.
    ResolvingPath,
    /// A start sequence is retrying the open of `path`.
    Opening { path: String },
    /// A connection is open at `path`.
    Open { path: String },
    /// Close was requested; waiting for the reader to release the port.
    TearingDown { path: String },
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ResolvingPath => write!(f, "resolving path"),
            Self::Opening { path } => write!(f, "opening {path}"),
            Self::Open { path } => write!(f, "open at {path}"),
            Self::TearingDown { path } => write!(f, "tearing down {path}"),
        }
    }
}

/// Details delivered with a close or error notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// True when the device side went away rather than us closing it.
    pub disconnected: bool,
    pub message: String,
}

impl CloseEvent {
    pub fn new(disconnected: bool, message: impl Into<String>) -> Self {
        Self {
            disconnected,
            message: message.into(),
        }
    }
}

/// How an open connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Closed(CloseEvent),
    Error(CloseEvent),
}

/// What a successful start sequence achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new connection was opened at `path`.
    Connected { path: String },
    /// A connection was already open at `path`; nothing changed.
    AlreadyOpen { path: String },
}
