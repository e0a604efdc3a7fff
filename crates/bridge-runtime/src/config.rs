//! # Runtime Configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML file, then
//! environment overrides, then command-line flags.
//!
//! ```toml
//! [api]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [bus]
//! address = "127.0.0.1:6379"
//!
//! [watchdog]
//! interval_secs = 10
//! ```

use bridge_core::ManagerConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Environment variable overriding `api.port`.
pub const ENV_API_PORT: &str = "BRIDGE_API_PORT";
/// Environment variable overriding `api.host`.
pub const ENV_API_HOST: &str = "BRIDGE_API_HOST";
/// Environment variable overriding `watchdog.interval_secs`.
pub const ENV_WATCHDOG_INTERVAL: &str = "BRIDGE_WATCHDOG_INTERVAL_SECS";
/// Environment variable overriding `bus.address`.
pub const ENV_BUS_ADDRESS: &str = "BRIDGE_BUS_ADDRESS";

/// Margin kept between the relay cap and the API request timeout.
pub const RELAY_TIMEOUT_HEADROOM: Duration = Duration::from_secs(1);

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub api: ApiConfig,
    pub bus: BusConfig,
    pub watchdog: WatchdogConfig,
    pub relay: RelayConfig,
    pub nodes: NodesConfig,
}

/// Control API listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on any single API call, relays included.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 60,
        }
    }
}

/// Bus connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Connection label handed to the transport factory for every node.
    pub address: String,
    /// Per-subscription delivery buffer.
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            channel_capacity: 1000,
        }
    }
}

/// Health watchdog settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub interval_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            probe_timeout_secs: 5,
        }
    }
}

/// Request relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Used when a request carries `timeout: 0`. Must stay below
    /// `api.request_timeout_secs`.
    pub default_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
        }
    }
}

/// Downstream node settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodesConfig {
    /// Host nodes listen on.
    pub probe_host: String,
    pub id_length: usize,
}

impl Default for NodesConfig {
    fn default() -> Self {
        Self {
            probe_host: "127.0.0.1".to_string(),
            id_length: 50,
        }
    }
}

impl BridgeConfig {
    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse from TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this shape.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_API_HOST) {
            self.api.host = host;
        }
        if let Some(port) = lookup(ENV_API_PORT) {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => warn!(key = ENV_API_PORT, value = %port, "Ignoring invalid override"),
            }
        }
        if let Some(secs) = lookup(ENV_WATCHDOG_INTERVAL) {
            match secs.parse() {
                Ok(s) => self.watchdog.interval_secs = s,
                Err(_) => {
                    warn!(key = ENV_WATCHDOG_INTERVAL, value = %secs, "Ignoring invalid override")
                }
            }
        }
        if let Some(address) = lookup(ENV_BUS_ADDRESS) {
            self.bus.address = address;
        }
    }

    /// Reject values the runtime cannot operate with.
    ///
    /// # Errors
    ///
    /// Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |key: &'static str, value: u64| {
            if value == 0 {
                Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                })
            } else {
                Ok(())
            }
        };
        positive("api.request_timeout_secs", self.api.request_timeout_secs)?;
        positive("bus.channel_capacity", self.bus.channel_capacity as u64)?;
        positive("watchdog.interval_secs", self.watchdog.interval_secs)?;
        positive("watchdog.probe_timeout_secs", self.watchdog.probe_timeout_secs)?;
        positive("relay.default_timeout_secs", self.relay.default_timeout_secs)?;
        positive("nodes.id_length", self.nodes.id_length as u64)?;

        if self.relay.default_timeout_secs >= self.api.request_timeout_secs {
            return Err(ConfigError::Invalid {
                key: "relay.default_timeout_secs",
                reason: format!(
                    "must be below api.request_timeout_secs ({})",
                    self.api.request_timeout_secs
                ),
            });
        }

        if self.bus.address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "bus.address",
                reason: "must not be empty".to_string(),
            });
        }
        if self.nodes.probe_host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "nodes.probe_host",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Node manager settings derived from this configuration.
    pub fn manager(&self) -> ManagerConfig {
        ManagerConfig {
            bus_address: self.bus.address.clone(),
            watchdog_interval: Duration::from_secs(self.watchdog.interval_secs),
            relay_timeout: Duration::from_secs(self.relay.default_timeout_secs),
            max_relay_timeout: self.request_timeout().saturating_sub(RELAY_TIMEOUT_HEADROOM),
            id_length: self.nodes.id_length,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.watchdog.probe_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// `host:port` the control API binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
