//! Configuration for the watcher.
//!
//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! 1. `--config <path>` on the command line
//! 2. `SERIAL_WATCH_CONFIG` environment variable (explicit path)
//! 3. `./serial-watch.toml` (current directory)
//! 4. The platform config directory (`~/.config/serial-watch/serial-watch.toml` on Linux)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `SERIAL_WATCH_<SECTION>_<KEY>`, for example
//! `SERIAL_WATCH_DEVICE_SERIAL_NUMBER=0240000030514E45` or
//! `SERIAL_WATCH_RETRY_OPEN_DELAY_MS=1000`.
//!
//! # Example
//!
//! ```rust,ignore
//! use serial_watch::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let settings = loader.config().connection_settings();
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, validate, ConfigLoader,
};
pub use schema::{Config, DeviceConfig, LogFormat, LoggingConfig, RetryConfig};
