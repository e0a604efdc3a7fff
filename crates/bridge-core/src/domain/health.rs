//! # Watchdog State Machine
//!
//! Pure transition function for the per-node health watchdog.
//!
//! | Suspended | Probe outcome | New status  | Action  |
//! |-----------|---------------|-------------|---------|
//! | any       | `PortClosed`  | Dirty       | Evict   |
//! | no        | `Unhealthy`   | Unreachable | Suspend |
//! | yes       | `Unhealthy`   | Unreachable | None    |
//! | yes       | `Healthy`     | Healthy     | Resume  |
//! | no        | `Healthy`     | Healthy     | None    |
//!
//! Probe errors never reach this function; the watchdog logs them and keeps
//! the current status.

use super::entities::HealthStatus;

/// Result of one successful health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The node's listen port refused the connection.
    PortClosed,
    /// The health endpoint answered "OK".
    Healthy,
    /// The health endpoint answered something else.
    Unhealthy,
}

/// Lifecycle action requested by a watchdog tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    None,
    /// Stop the node and mark it suspended.
    Suspend,
    /// Start the node again and clear the suspended flag.
    Resume,
    /// Delete the node and end the watchdog.
    Evict,
}

/// Compute the new status and the action for one tick.
#[must_use]
pub fn decide(suspended: bool, outcome: ProbeOutcome) -> (HealthStatus, WatchdogAction) {
    match (outcome, suspended) {
        (ProbeOutcome::PortClosed, _) => (HealthStatus::Dirty, WatchdogAction::Evict),
        (ProbeOutcome::Unhealthy, false) => (HealthStatus::Unreachable, WatchdogAction::Suspend),
        (ProbeOutcome::Unhealthy, true) => (HealthStatus::Unreachable, WatchdogAction::None),
        (ProbeOutcome::Healthy, true) => (HealthStatus::Healthy, WatchdogAction::Resume),
        (ProbeOutcome::Healthy, false) => (HealthStatus::Healthy, WatchdogAction::None),
    }
}
