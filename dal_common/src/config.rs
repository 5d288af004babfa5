//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the DAL TOML
//! configuration: shared service settings, the `[[device]]` array and the
//! `[simulation]` table.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dal_common::config::{ConfigError, ConfigLoader, DalConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = DalConfig::load(Path::new("devices.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::consts::DEFAULT_MOVE_TIMEOUT_MS;
use crate::device::DeviceConfig;
use crate::simulation::SimulationConfig;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

fn default_move_timeout_ms() -> u64 {
    DEFAULT_MOVE_TIMEOUT_MS
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "dal-hutch-01"
/// default_move_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,

    /// Move timeout used when neither caller nor device sets one [ms].
    #[serde(default = "default_move_timeout_ms")]
    pub default_move_timeout_ms: u64,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - `default_move_timeout_ms` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        if self.default_move_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "default_move_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Default move timeout as `Duration`.
    pub fn default_move_timeout(&self) -> Duration {
        Duration::from_millis(self.default_move_timeout_ms)
    }
}

/// Top-level configuration file.
///
/// ```toml
/// [shared]
/// service_name = "dal-sim"
///
/// [[device]]
/// name = "st1"
/// prefix = "HXR:STP:01"
/// kind = "stopper"
///
/// [[simulation.initial]]
/// address = "HXR:STP:01:OPEN"
/// value = 1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DalConfig {
    /// `[shared]` table.
    pub shared: SharedConfig,

    /// `[[device]]` entries, in file order.
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceConfig>,

    /// `[simulation]` table.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl DalConfig {
    /// Validate shared settings and device name uniqueness.
    ///
    /// Per-device tables are validated when definitions are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let mut names = HashSet::new();
        for device in &self.devices {
            if device.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "device name cannot be empty".to_string(),
                ));
            }
            if !names.insert(device.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate device name '{}'",
                    device.name
                )));
            }
            if device.move_timeout_ms == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "device '{}': move_timeout_ms must be greater than zero",
                    device.name
                )));
            }
        }
        Ok(())
    }

    /// Look up a device by name.
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for any `serde::de::DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
