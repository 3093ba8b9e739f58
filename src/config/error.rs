//! Errors raised while loading configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--config` pointed at a file that does not exist.
    #[error("Config file {0} does not exist")]
    NotFound(PathBuf),

    #[error("Cannot read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value parsed but is unusable, e.g. zero retry attempts.
    #[error("Invalid value for {key}: {message}")]
    ValidationError { key: String, message: String },

    /// A `SERIAL_WATCH_*` override did not parse.
    #[error("Invalid environment override {var}: {message}")]
    EnvParseError { var: String, message: String },
}

impl ConfigError {
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn env_parse(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
