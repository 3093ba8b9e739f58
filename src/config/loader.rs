//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_WATCH";

/// Config file name
const CONFIG_FILE_NAME: &str = "serial-watch.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_WATCH_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERIAL_WATCH_CONFIG` environment variable (explicit path)
    /// 2. `./serial-watch.toml` (current directory)
    /// 3. The platform config directory from `ProjectDirs`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values, and the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    ///
    /// Unlike [`ConfigLoader::load`], a missing file is an error.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }

        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Platform config directory, e.g. `~/.config/serial-watch` on Linux.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "serial-watch").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_WATCH_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_WATCH_DEVICE_SERIAL_NUMBER=0240000030514E45`
/// - `SERIAL_WATCH_RETRY_OPEN_DELAY_MS=1000`
/// - `SERIAL_WATCH_LOGGING_FORMAT=compact`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    apply_overrides(config, |var| std::env::var(var).ok())
}

fn apply_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| format!("{ENV_PREFIX}_{key}");

    if let Some(val) = lookup(&var("DEVICE_SERIAL_NUMBER")) {
        config.device.serial_number = val;
    }
    if let Some(val) = lookup(&var("DEVICE_SETTLE_DELAY_MS")) {
        config.device.settle_delay_ms = parse(&var("DEVICE_SETTLE_DELAY_MS"), &val)?;
    }

    if let Some(val) = lookup(&var("RETRY_RESOLVE_ATTEMPTS")) {
        config.retry.resolve_attempts = parse(&var("RETRY_RESOLVE_ATTEMPTS"), &val)?;
    }
    if let Some(val) = lookup(&var("RETRY_RESOLVE_DELAY_MS")) {
        config.retry.resolve_delay_ms = parse(&var("RETRY_RESOLVE_DELAY_MS"), &val)?;
    }
    if let Some(val) = lookup(&var("RETRY_OPEN_ATTEMPTS")) {
        config.retry.open_attempts = parse(&var("RETRY_OPEN_ATTEMPTS"), &val)?;
    }
    if let Some(val) = lookup(&var("RETRY_OPEN_DELAY_MS")) {
        config.retry.open_delay_ms = parse(&var("RETRY_OPEN_DELAY_MS"), &val)?;
    }

    if let Some(val) = lookup(&var("LOGGING_LEVEL")) {
        config.logging.level = val;
    }
    if let Some(val) = lookup(&var("LOGGING_FORMAT")) {
        config.logging.format = match val.to_lowercase().as_str() {
            "full" => super::LogFormat::Full,
            "compact" => super::LogFormat::Compact,
            _ => {
                return Err(ConfigError::env_parse(
                    var("LOGGING_FORMAT"),
                    "Expected 'full' or 'compact'",
                ))
            }
        };
    }

    Ok(())
}

fn parse<T: FromStr>(var: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(var, format!("Invalid value '{value}'")))
}

/// Reject values the connection manager cannot work with.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.device.serial_number.trim().is_empty() {
        return Err(ConfigError::validation(
            "device.serial_number",
            "must not be empty",
        ));
    }
    if config.retry.resolve_attempts == 0 {
        return Err(ConfigError::validation(
            "retry.resolve_attempts",
            "must be at least 1",
        ));
    }
    if config.retry.open_attempts == 0 {
        return Err(ConfigError::validation(
            "retry.open_attempts",
            "must be at least 1",
        ));
    }
    Ok(())
}
