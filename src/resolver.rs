//! Maps a device serial number to the OS path of its serial port.

use crate::error::ConnectionError;
use crate::identity::DeviceIdentity;
use crate::port::SerialBackend;
use crate::retry::{retry, Delay, RetryError, RetryPolicy};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Looks up the current path of the port whose USB serial number matches.
///
/// The path is not stable across re-insertions, so it is looked up fresh on
/// every start sequence and never cached.
#[derive(Clone)]
pub struct SerialPathResolver {
    backend: Arc<dyn SerialBackend>,
}

impl SerialPathResolver {
    pub fn new(backend: Arc<dyn SerialBackend>) -> Self {
        Self { backend }
    }

    /// Single lookup: the first visible port whose serial number matches.
    pub fn resolve(&self, identity: &DeviceIdentity) -> Result<String, ConnectionError> {
        let ports = self
            .backend
            .available_ports()
            .map_err(ConnectionError::Enumeration)?;

        ports
            .into_iter()
            .find(|port| {
                port.serial_number
                    .as_deref()
                    .is_some_and(|sn| identity.matches(sn))
            })
            .map(|port| {
                debug!(identity = %identity, path = %port.path, "Resolved serial path");
                port.path
            })
            .ok_or_else(|| ConnectionError::PathNotFound {
                identity: identity.to_string(),
            })
    }

    /// Lookup retried under `policy` until the device shows up.
    pub async fn resolve_with_retry(
        &self,
        identity: &DeviceIdentity,
        policy: RetryPolicy,
        token: &CancellationToken,
        delay: &dyn Delay,
    ) -> Result<String, RetryError<ConnectionError>> {
        retry("resolve serial path", policy, token, delay, || async move {
            self.resolve(identity)
        })
        .await
    }
}

impl std::fmt::Debug for SerialPathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPathResolver").finish_non_exhaustive()
    }
}
