//! Tracing subscriber setup.
//!
//! Logs go to stderr; stdout is reserved for the bytes read from the device.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::AppError;
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pick the filter directive.
///
/// Each `-v` raises the configured level by one step, capped at `trace`.
pub fn filter_directive(config: &LoggingConfig, verbosity: u8) -> String {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

    if verbosity == 0 {
        return config.level.clone();
    }

    let base = LEVELS
        .iter()
        .position(|l| l.eq_ignore_ascii_case(config.level.trim()))
        .unwrap_or(2);
    let level = LEVELS[(base + verbosity as usize).min(LEVELS.len() - 1)];
    level.to_string()
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig, verbosity: u8) -> Result<(), AppError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(config, verbosity))
            .map_err(|e| AppError::Logging(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Full => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };

    result.map_err(|e| AppError::Logging(e.to_string()))
}
