//! # Health Watchdog
//!
//! One task per node. Every interval it probes the node and applies
//! [`decide`]: suspend on an unhealthy answer, resume once healthy again,
//! evict when the listen port is closed.
//!
//! The task ends on eviction, on [`Node::cancel`], or when it finds the
//! node already gone from the registry. Registry presence is re-checked after
//! every probe, before any destructive action.

use crate::domain::{decide, HealthStatus, WatchdogAction};
use crate::error::ProxyError;
use crate::ports::NodeProber;
use crate::service::node::{delete_node, Node};
use crate::service::registry::NodeRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Result of one watchdog step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Finished,
}

/// Health monitor for a single node.
pub struct Watchdog {
    node: Arc<Node>,
    registry: Arc<NodeRegistry>,
    prober: Arc<dyn NodeProber>,
    interval: Duration,
    suspended: bool,
}

impl Watchdog {
    pub fn new(
        node: Arc<Node>,
        registry: Arc<NodeRegistry>,
        prober: Arc<dyn NodeProber>,
        interval: Duration,
    ) -> Self {
        Self {
            node,
            registry,
            prober,
            interval,
            suspended: false,
        }
    }

    /// Whether the watchdog has stopped the node.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn should_exit(&self) -> bool {
        self.node.is_cancelled() || !self.registry.contains(self.node.id())
    }

    /// Probe once and apply the resulting transition.
    pub async fn tick(&mut self) -> Tick {
        if self.should_exit() {
            return Tick::Finished;
        }

        let outcome = match self
            .prober
            .probe(self.node.port(), self.node.health_check())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(node_id = %self.node.id(), error = %e, "Health probe failed");
                return Tick::Continue;
            }
        };

        if self.should_exit() {
            debug!(node_id = %self.node.id(), "Node removed during probe");
            return Tick::Finished;
        }

        let (status, action) = decide(self.suspended, outcome);
        match action {
            WatchdogAction::Evict => {
                self.node.set_status(HealthStatus::Dirty);
                warn!(node_id = %self.node.id(), port = %self.node.port(), "Node port closed, evicting");
                delete_node(&self.registry, self.prober.as_ref(), &self.node).await;
                return Tick::Finished;
            }
            WatchdogAction::Suspend => {
                let reason = ProxyError::ProbeUnhealthy {
                    port: self.node.port().to_string(),
                };
                warn!(node_id = %self.node.id(), reason = %reason, "Suspending node");
                match self.node.stop() {
                    Ok(()) => self.suspended = true,
                    Err(e) => warn!(node_id = %self.node.id(), error = %e, "Suspend failed"),
                }
            }
            WatchdogAction::Resume => {
                info!(node_id = %self.node.id(), "Node healthy again, resuming");
                if let Err(e) = self.node.start() {
                    warn!(node_id = %self.node.id(), error = %e, "Resume failed, retrying next tick");
                    // Partial activation is closed again; the status stays as it was.
                    if let Err(stop_err) = self.node.stop() {
                        debug!(node_id = %self.node.id(), error = %stop_err, "Stop after failed resume");
                    }
                    return Tick::Continue;
                }
                self.suspended = false;
            }
            WatchdogAction::None => {}
        }

        let previous = self.node.set_status(status);
        if previous != status {
            info!(node_id = %self.node.id(), from = %previous, to = %status, "Node status changed");
        }
        Tick::Continue
    }

    /// Tick every interval until finished or cancelled.
    pub async fn run(mut self) {
        let mut shutdown = self.node.shutdown_signal();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        debug!(node_id = %self.node.id(), interval_ms = self.interval.as_millis(), "Watchdog started");
        loop {
            if self.node.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            if self.tick().await == Tick::Finished {
                break;
            }
        }
        debug!(node_id = %self.node.id(), "Watchdog exited");
    }

    /// Run on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
