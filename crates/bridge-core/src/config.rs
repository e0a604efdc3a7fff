//! Runtime parameters of the node manager.

use std::time::Duration;

/// Default interval between watchdog probes.
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(10);

/// Default relay timeout for requests that do not set one.
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound on any relay wait. Stays below the control API's
/// default 60 s request timeout.
pub const DEFAULT_MAX_RELAY_TIMEOUT: Duration = Duration::from_secs(59);

/// Length of generated node identifiers.
pub const DEFAULT_ID_LENGTH: usize = 50;

/// Node manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Bus address handed to the transport factory for every node.
    pub bus_address: String,
    /// Interval between watchdog probes.
    pub watchdog_interval: Duration,
    /// Relay timeout for requests with `timeout == 0`.
    pub relay_timeout: Duration,
    /// Cap on the wait of any relayed request, whatever timeout it asks for.
    pub max_relay_timeout: Duration,
    /// Length of generated node identifiers.
    pub id_length: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            bus_address: "127.0.0.1:6379".to_string(),
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            relay_timeout: DEFAULT_RELAY_TIMEOUT,
            max_relay_timeout: DEFAULT_MAX_RELAY_TIMEOUT,
            id_length: DEFAULT_ID_LENGTH,
        }
    }
}
