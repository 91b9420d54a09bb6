//! Configuration loading traits and types.
//!
//! One TOML file configures the whole control core. Every section is
//! optional and falls back to the defaults in [`crate::consts`].
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! log_level = "debug"
//! service_name = "axon-bench-01"
//!
//! [watchdog]
//! sweep_interval_ms = 500
//! default_threshold_ms = 2000
//! capture_heartbeat_stack = true
//!
//! [timer]
//! poll_interval_ms = 5
//!
//! [odometry]
//! sample_interval_ms = 10
//!
//! [velocity]
//! control_interval_ms = 10
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use axon_common::config::{AxonConfig, ConfigError, ConfigLoader};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = AxonConfig::load(Path::new("axon.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_HEARTBEAT_THRESHOLD_MS, DEFAULT_ODOMETRY_SAMPLE_MS, DEFAULT_TIMER_POLL_MS,
    DEFAULT_VELOCITY_CONTROL_MS, DEFAULT_WATCHDOG_SWEEP_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

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

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common fields shared by every AXON application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "axon".to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[watchdog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Period of the expiry sweep.
    pub sweep_interval_ms: u64,
    /// Threshold used by `register_default`.
    pub default_threshold_ms: u64,
    /// Re-capture the owner's stack on every heartbeat.
    ///
    /// Expiry reports then show where the thread last checked in rather than
    /// where it registered. Costs a backtrace per heartbeat.
    pub capture_heartbeat_stack: bool,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: DEFAULT_WATCHDOG_SWEEP_MS,
            default_threshold_ms: DEFAULT_HEARTBEAT_THRESHOLD_MS,
            capture_heartbeat_stack: false,
        }
    }
}

impl WatchdogConfig {
    /// Sweep period as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Default heartbeat threshold as a `Duration`.
    pub fn default_threshold(&self) -> Duration {
        Duration::from_millis(self.default_threshold_ms)
    }
}

/// `[timer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Period of the authority's expiry poll.
    pub poll_interval_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_TIMER_POLL_MS,
        }
    }
}

impl TimerConfig {
    /// Poll period as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `[odometry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OdometryConfig {
    /// Period of the sampling sweep.
    pub sample_interval_ms: u64,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_ODOMETRY_SAMPLE_MS,
        }
    }
}

impl OdometryConfig {
    /// Sampling period as a `Duration`.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// `[velocity]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Period of each motor's control step.
    pub control_interval_ms: u64,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            control_interval_ms: DEFAULT_VELOCITY_CONTROL_MS,
        }
    }
}

impl VelocityConfig {
    /// Control period as a `Duration`.
    pub fn control_interval(&self) -> Duration {
        Duration::from_millis(self.control_interval_ms)
    }
}

/// Complete control-core configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AxonConfig {
    /// Shared application settings.
    pub shared: SharedConfig,
    /// Watchdog registry settings.
    pub watchdog: WatchdogConfig,
    /// Timer authority settings.
    pub timer: TimerConfig,
    /// Odometry ring settings.
    pub odometry: OdometryConfig,
    /// Velocity control settings.
    pub velocity: VelocityConfig,
}

impl AxonConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the service name is empty or
    /// any interval/threshold is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        let intervals = [
            ("watchdog.sweep_interval_ms", self.watchdog.sweep_interval_ms),
            ("watchdog.default_threshold_ms", self.watchdog.default_threshold_ms),
            ("timer.poll_interval_ms", self.timer.poll_interval_ms),
            ("odometry.sample_interval_ms", self.odometry.sample_interval_ms),
            ("velocity.control_interval_ms", self.velocity.control_interval_ms),
        ];
        for (key, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must be greater than 0"
                )));
            }
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
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

// Blanket implementation: any serde-deserializable struct can be loaded.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
