//! Bounded, fixed-delay retry with per-session cancellation.
//!
//! The delay source is injected through the [`Delay`] trait so tests can run
//! hundreds of attempts without touching the wall clock.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors that know whether another attempt could succeed.
pub trait RetryableError: fmt::Display {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Attempt bound and spacing for one retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations, including the first. Treated as at least 1.
    pub max_attempts: u32,
    /// Wait between a failed attempt and the next one.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Serial path lookup right after hotplug: the OS may still be enumerating.
    pub const PATH_RESOLUTION: Self = Self::new(100, Duration::from_secs(1));

    /// Opening the port once its path is known.
    pub const PORT_OPEN: Self = Self::new(1000, Duration::from_secs(5));

    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Why a retried operation did not produce a value.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last failure.
    Exhausted { attempts: u32, last: E },
    /// The session was cancelled before the next attempt.
    Cancelled { attempts: u32 },
    /// The operation reported a failure that must not be retried.
    Aborted(E),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            Self::Cancelled { attempts } => write!(f, "cancelled after {attempts} attempts"),
            Self::Aborted(e) => write!(f, "{e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Source of the waits between attempts.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real waits on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `operation` until it succeeds, fails fatally, runs out of attempts,
/// or `token` is cancelled.
///
/// The token is checked before every attempt, the first included. A pending
/// delay also ends early on cancellation; an attempt already running is
/// never interrupted.
pub async fn retry<T, E, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    token: &CancellationToken,
    delay: &dyn Delay,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: RetryableError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if token.is_cancelled() {
            debug!(label, attempts = attempt, "Retry cancelled");
            return Err(RetryError::Cancelled { attempts: attempt });
        }
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "Succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => return Err(RetryError::Aborted(e)),
            Err(e) if attempt >= max_attempts => {
                warn!(label, attempt, "Error: {e}");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                warn!(label, attempt, max_attempts, "Error: {e}");
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = delay.sleep(policy.delay) => {}
                }
            }
        }
    }
}
