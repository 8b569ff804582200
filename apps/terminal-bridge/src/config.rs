//! Configuration for the terminal bridge.
//!
//! Loaded from a YAML file with serde defaults for every section, so a
//! minimal config (or none at all) still produces a runnable bridge.
//!
//! # Usage
//!
//! ```rust,ignore
//! use terminal_bridge::config::{Config, load_config};
//!
//! // Load from default path (bridge.yaml)
//! let config = load_config(None)?;
//!
//! // Access configuration values
//! println!("cycle interval: {} ms", config.bridge.interval_ms);
//! ```

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cycle timing and transport layout.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Command ingestion behavior.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Trading limits applied before any platform call.
    #[serde(default)]
    pub trading: TradingConfig,
    /// Publisher behavior.
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Cycle timing and transport layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directory holding all transport files.
    pub data_dir: PathBuf,
    /// Cycle timer interval in milliseconds.
    pub interval_ms: u64,
    /// Maximum command files scanned per cycle (contiguous prefix).
    pub max_command_files: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("bridge_data"),
            interval_ms: 25,
            max_command_files: 50,
        }
    }
}

/// Command ingestion behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Capacity of the circular command-id log.
    pub registry_capacity: usize,
    /// Abort the remainder of a cycle's scan on the first malformed or
    /// duplicate command. Matches the historical behavior when `true`;
    /// `false` skips the offending file and continues.
    pub abort_batch_on_error: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            registry_capacity: 1000,
            abort_batch_on_error: true,
        }
    }
}

/// Trading limits applied before any platform call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Maximum simultaneously open or pending orders.
    pub max_orders: usize,
    /// Maximum lot size accepted for a single order.
    pub max_lots: Decimal,
    /// Slippage tolerance in points for market closes.
    pub slippage_points: u32,
    /// Decimal precision for lot sizes.
    pub lot_digits: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_orders: 20,
            max_lots: Decimal::new(100, 0),
            slippage_points: 3,
            lot_digits: 2,
        }
    }
}

/// Publisher behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Number of recent messages retained in the ring buffer.
    pub message_buffer: usize,
    /// Pre-open charts for bar-data subscriptions to cut first-fetch latency.
    pub open_charts_bar_data: bool,
    /// Pre-open charts for historic-data requests.
    pub open_charts_historic_data: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            message_buffer: 50,
            open_charts_bar_data: true,
            open_charts_historic_data: true,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first
    /// invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "bridge.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.bridge.max_command_files == 0 {
            return Err(ConfigError::ValidationError(
                "bridge.max_command_files must be greater than zero".to_string(),
            ));
        }
        if self.bridge.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "bridge.data_dir must not be empty".to_string(),
            ));
        }
        if self.ingest.registry_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.registry_capacity must be greater than zero".to_string(),
            ));
        }
        if self.trading.max_lots <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "trading.max_lots must be positive".to_string(),
            ));
        }
        if self.publish.message_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "publish.message_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from a YAML file.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "bridge.yaml".
///   A missing default file yields `Config::default()`.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let explicit = path.is_some();
    let path = path.unwrap_or("bridge.yaml");

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_string(),
                source: e,
            });
        }
    };

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    config.validate()?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}
