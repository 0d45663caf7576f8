//! Configuration parsing and management.
//!
//! This module handles parsing of `threadlab.toml`, which carries the daemon
//! listen address and the scenario timings. Every field has a default, so an
//! empty file (or no file) is a valid configuration.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default trigger listener address.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Default delay the HOLDER gets before the WAITER starts.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 1000;

/// Default critical-section delay for deadlock participants.
pub const DEFAULT_HOLD_DELAY_MS: u64 = 100;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LabConfig {
    /// Daemon configuration.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Scenario timing configuration.
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl LabConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails [`validate`].
    ///
    /// [`validate`]: Self::validate
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Checks invariants serde cannot express.
    ///
    /// Both delays must be non-zero: a zero grace period lets the WAITER race
    /// the HOLDER under fixed-delay ordering, and a zero hold delay makes the
    /// deadlock a rare accident.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scenario.grace_period_ms == 0 {
            return Err(ConfigError::Validation(
                "scenario.grace_period_ms must be greater than zero".to_string(),
            ));
        }
        if self.scenario.hold_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "scenario.hold_delay_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address the trigger listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// How the blocking scenario keeps the WAITER from beating the HOLDER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartOrdering {
    /// Wait for the HOLDER to confirm it owns the lock, bounded by the grace
    /// period.
    #[default]
    Handshake,
    /// Sleep the grace period and hope the HOLDER was scheduled. Can lose the
    /// race on a heavily loaded host.
    FixedDelay,
}

/// Scenario timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Delay (or handshake bound) between starting HOLDER and WAITER.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Time each deadlock participant holds its first lock before reaching
    /// for the second.
    #[serde(default = "default_hold_delay_ms")]
    pub hold_delay_ms: u64,

    /// HOLDER/WAITER start ordering strategy.
    #[serde(default)]
    pub start_ordering: StartOrdering,
}

impl ScenarioConfig {
    /// Grace period as a [`Duration`].
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Hold delay as a [`Duration`].
    #[must_use]
    pub const fn hold_delay(&self) -> Duration {
        Duration::from_millis(self.hold_delay_ms)
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            hold_delay_ms: DEFAULT_HOLD_DELAY_MS,
            start_ordering: StartOrdering::default(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

const fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}

const fn default_hold_delay_ms() -> u64 {
    DEFAULT_HOLD_DELAY_MS
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}
