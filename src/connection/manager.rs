//! Connection manager: the single owner of the serial connection.
//!
//! Every start request runs as a retry session with its own cancellation
//! token. A newer start, a stop, or the owned connection closing cancels the
//! current session; a cancelled session can never install a connection and
//! never affects the sessions that come after it.

use super::state::{CloseEvent, ConnectionEvent, ConnectionState, StartOutcome};
use crate::error::ConnectionError;
use crate::identity::DeviceIdentity;
use crate::port::{AsyncSerialPortAdapter, PortConfiguration, SerialBackend};
use crate::reader::{OutputSink, StreamReader};
use crate::resolver::SerialPathResolver;
use crate::retry::{retry, Delay, RetryError, RetryPolicy, TokioDelay};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default wait after a hotplug "add" before looking for the serial port.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Tunables of the start sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Wait before the first path lookup of every start.
    pub settle_delay: Duration,
    pub resolve_policy: RetryPolicy,
    pub open_policy: RetryPolicy,
    pub port: PortConfiguration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            resolve_policy: RetryPolicy::PATH_RESOLUTION,
            open_policy: RetryPolicy::PORT_OPEN,
            port: PortConfiguration::default(),
        }
    }
}

#[derive(Debug)]
enum SessionPhase {
    ResolvingPath,
    Opening { path: String },
}

#[derive(Debug)]
struct RetrySession {
    id: u64,
    token: CancellationToken,
    phase: SessionPhase,
}

#[derive(Debug)]
struct OwnedConnection {
    id: u64,
    path: String,
    close: CancellationToken,
    closing: bool,
    reader: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct ManagerState {
    session: Option<RetrySession>,
    connection: Option<OwnedConnection>,
    next_session_id: u64,
    next_connection_id: u64,
    connections_opened: u64,
}

impl ManagerState {
    fn state(&self) -> ConnectionState {
        if let Some(conn) = &self.connection {
            let path = conn.path.clone();
            return if conn.closing {
                ConnectionState::TearingDown { path }
            } else {
                ConnectionState::Open { path }
            };
        }
        match &self.session {
            Some(session) if !session.token.is_cancelled() => match &session.phase {
                SessionPhase::ResolvingPath => ConnectionState::ResolvingPath,
                SessionPhase::Opening { path } => ConnectionState::Opening { path: path.clone() },
            },
            _ => ConnectionState::Idle,
        }
    }

    fn is_current(&self, session_id: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.id == session_id && !s.token.is_cancelled())
    }

    fn cancel_session(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(session = session.id, "Cancelling retry session");
            session.token.cancel();
        }
    }
}

enum OpenAttempt {
    Opened(Box<dyn AsyncSerialPortAdapter>),
    AlreadyOpen,
}

/// Owns at most one serial connection and the retry session creating it.
///
/// Cloning is cheap and every clone drives the same connection; the hotplug
/// dispatcher and the per-connection reader task each hold one.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Mutex<ManagerState>>,
    backend: Arc<dyn SerialBackend>,
    resolver: SerialPathResolver,
    sink: Arc<dyn OutputSink>,
    delay: Arc<dyn Delay>,
    settings: ConnectionSettings,
}

impl ConnectionManager {
    pub fn new(backend: Arc<dyn SerialBackend>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManagerState::default())),
            resolver: SerialPathResolver::new(Arc::clone(&backend)),
            backend,
            sink,
            delay: Arc::new(TokioDelay),
            settings: ConnectionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the source of settle and retry waits.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state()
    }

    /// Path of the owned connection, if one is open.
    pub fn connected_path(&self) -> Option<String> {
        self.inner
            .lock()
            .connection
            .as_ref()
            .filter(|c| !c.closing)
            .map(|c| c.path.clone())
    }

    /// Number of connections created since construction.
    pub fn connections_opened(&self) -> u64 {
        self.inner.lock().connections_opened
    }

    /// Run `start` on a background task so stop requests can interleave.
    pub fn spawn_start(
        &self,
        identity: DeviceIdentity,
    ) -> JoinHandle<Result<StartOutcome, ConnectionError>> {
        let manager = self.clone();
        tokio::spawn(async move { manager.start(&identity).await })
    }

    /// Resolve the device's serial path and open a connection to it.
    ///
    /// Supersedes any start still in flight. Every failure is logged here;
    /// the result only tells the caller what happened.
    pub async fn start(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<StartOutcome, ConnectionError> {
        let (session_id, token) = self.begin_session();
        info!(session = session_id, identity = %identity, "Starting serial monitor");

        if !self.settings.settle_delay.is_zero() {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = self.delay.sleep(self.settings.settle_delay) => {}
            }
        }

        let resolved = self
            .resolver
            .resolve_with_retry(
                identity,
                self.settings.resolve_policy,
                &token,
                self.delay.as_ref(),
            )
            .await;
        let path = match resolved {
            Ok(path) => path,
            Err(failure) => {
                self.end_session(session_id);
                return Err(match failure {
                    RetryError::Cancelled { attempts } => {
                        info!(session = session_id, attempts, "Path lookup cancelled");
                        ConnectionError::Cancelled
                    }
                    RetryError::Exhausted { attempts, last } => {
                        error!(session = session_id, attempts, "No serial path found for {identity}");
                        last
                    }
                    RetryError::Aborted(e) => {
                        error!(session = session_id, "{e}");
                        e
                    }
                });
            }
        };

        if !self.enter_opening(session_id, &path) {
            info!(session = session_id, "Start sequence superseded before open");
            return Err(ConnectionError::Cancelled);
        }

        let target = path.as_str();
        let attempt = retry(
            "open serial port",
            self.settings.open_policy,
            &token,
            self.delay.as_ref(),
            || self.try_open(target),
        )
        .await;

        match attempt {
            Ok(OpenAttempt::Opened(port)) => self.install(session_id, path, port),
            Ok(OpenAttempt::AlreadyOpen) => {
                self.end_session(session_id);
                info!(path = %path, "Connection to {path} already open");
                Ok(StartOutcome::AlreadyOpen { path })
            }
            Err(failure) => {
                self.end_session(session_id);
                Err(match failure {
                    RetryError::Cancelled { attempts } => {
                        info!(session = session_id, attempts, "Open of {path} cancelled");
                        ConnectionError::Cancelled
                    }
                    RetryError::Exhausted { attempts, last } => {
                        error!(session = session_id, attempts, "Failed to connect to serial port {path}");
                        last
                    }
                    RetryError::Aborted(e) => {
                        error!(session = session_id, "{e}");
                        e
                    }
                })
            }
        }
    }

    /// Cancel any start in flight and close the owned connection.
    ///
    /// Returns once the connection's reader has released the port. A no-op
    /// when nothing is open.
    pub async fn stop(&self) {
        let (connection_id, reader) = {
            let mut inner = self.inner.lock();
            inner.cancel_session();
            match inner.connection.as_mut() {
                Some(conn) if !conn.closing => {
                    info!(path = %conn.path, "Stopping serial monitor");
                    conn.closing = true;
                    conn.close.cancel();
                    (conn.id, conn.reader.take())
                }
                _ => {
                    debug!("Stop requested with no open connection");
                    return;
                }
            }
        };

        if let Some(reader) = reader {
            if let Err(e) = reader.await {
                warn!("Reader task ended abnormally: {e}");
            }
        }
        // Normally the reader already reported the close; this covers a
        // reader that panicked.
        self.handle_event(
            connection_id,
            ConnectionEvent::Closed(CloseEvent::new(false, "closed on request")),
        );
    }

    fn begin_session(&self) -> (u64, CancellationToken) {
        let mut inner = self.inner.lock();
        inner.cancel_session();
        inner.next_session_id += 1;
        let id = inner.next_session_id;
        let token = CancellationToken::new();
        inner.session = Some(RetrySession {
            id,
            token: token.clone(),
            phase: SessionPhase::ResolvingPath,
        });
        (id, token)
    }

    fn enter_opening(&self, session_id: u64, path: &str) -> bool {
        let mut inner = self.inner.lock();
        if !inner.is_current(session_id) {
            return false;
        }
        if let Some(session) = inner.session.as_mut() {
            session.phase = SessionPhase::Opening {
                path: path.to_string(),
            };
        }
        true
    }

    fn end_session(&self, session_id: u64) {
        let mut inner = self.inner.lock();
        if inner.session.as_ref().is_some_and(|s| s.id == session_id) {
            inner.session = None;
        }
    }

    async fn try_open(&self, path: &str) -> Result<OpenAttempt, ConnectionError> {
        let existing = self
            .inner
            .lock()
            .connection
            .as_ref()
            .map(|c| (c.path.clone(), c.closing));

        match existing {
            Some((open, false)) if open == path => return Ok(OpenAttempt::AlreadyOpen),
            Some((_, true)) => {
                return Err(ConnectionError::Closing {
                    path: path.to_string(),
                })
            }
            Some((open, false)) => {
                return Err(ConnectionError::ConflictingConnection {
                    open,
                    requested: path.to_string(),
                })
            }
            None => {}
        }

        let port = self
            .backend
            .open(path, &self.settings.port)
            .await
            .map_err(|source| ConnectionError::Open {
                path: path.to_string(),
                source,
            })?;
        Ok(OpenAttempt::Opened(port))
    }

    /// Take ownership of a freshly opened port and start its reader.
    fn install(
        &self,
        session_id: u64,
        path: String,
        port: Box<dyn AsyncSerialPortAdapter>,
    ) -> Result<StartOutcome, ConnectionError> {
        let mut inner = self.inner.lock();

        if !inner.is_current(session_id) {
            drop(inner);
            drop(port);
            info!(session = session_id, path = %path, "Start sequence superseded; closed {path}");
            return Err(ConnectionError::Cancelled);
        }
        if let Some(existing) = &inner.connection {
            let err = ConnectionError::ConflictingConnection {
                open: existing.path.clone(),
                requested: path,
            };
            inner.session = None;
            error!(session = session_id, "{err}");
            return Err(err);
        }

        inner.session = None;
        inner.next_connection_id += 1;
        inner.connections_opened += 1;
        let connection_id = inner.next_connection_id;

        let close = CancellationToken::new();
        let reader = StreamReader::new(port, Arc::clone(&self.sink));
        let manager = self.clone();
        let reader_close = close.clone();
        let handle = tokio::spawn(async move {
            let event = reader.run(reader_close).await;
            manager.handle_event(connection_id, event);
        });

        inner.connection = Some(OwnedConnection {
            id: connection_id,
            path: path.clone(),
            close,
            closing: false,
            reader: Some(handle),
        });
        info!(path = %path, "Connection to {path} was successful");
        Ok(StartOutcome::Connected { path })
    }

    /// Tear down after the connection identified by `connection_id` closed or
    /// failed. Events for a connection no longer owned are ignored, so the
    /// teardown runs exactly once.
    fn handle_event(&self, connection_id: u64, event: ConnectionEvent) {
        let mut inner = self.inner.lock();
        let path = match inner.connection.as_ref() {
            Some(conn) if conn.id == connection_id => conn.path.clone(),
            _ => {
                debug!(connection = connection_id, "Ignoring event for a released connection");
                return;
            }
        };

        match &event {
            ConnectionEvent::Closed(close) => {
                info!(path = %path, disconnected = close.disconnected, "closing connection to {path}...");
            }
            ConnectionEvent::Error(close) => {
                error!(path = %path, disconnected = close.disconnected, "error on {path}: {}", close.message);
            }
        }

        inner.cancel_session();
        if let Some(conn) = inner.connection.take() {
            conn.close.cancel();
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
