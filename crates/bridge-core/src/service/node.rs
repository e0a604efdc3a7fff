//! # Node Lifecycle
//!
//! A [`Node`] owns its declared bindings, its transport connection and its
//! health status. All mutable fields sit behind one per-node lock; transport
//! calls made under it are non-blocking.
//!
//! ```text
//! create ──probe──→ put ──start──→ [running] ──stop──→ [stopped]
//!                                      ↑                   │
//!                                      └──────start────────┘
//! delete (any state) ──→ registry.del + stop + cancel watchdog
//! ```

use crate::domain::{
    HealthStatus, NodeDescription, NodeId, NodeSnapshot, Service, Slot, DEFAULT_HEALTH_PATH,
};
use crate::error::ProxyError;
use crate::ports::{Forwarder, NodeProber, SubscriptionHandle, Transport};
use crate::service::registry::NodeRegistry;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// A declared binding and its live subscription, if any.
#[derive(Debug, Clone)]
pub(crate) struct Binding<T> {
    pub(crate) declared: T,
    pub(crate) handle: Option<SubscriptionHandle>,
}

impl<T> Binding<T> {
    pub(crate) fn inactive(declared: T) -> Self {
        Self { declared, handle: None }
    }
}

/// Mutable per-node state.
#[derive(Debug, Default)]
pub(crate) struct NodeState {
    pub(crate) status: HealthStatus,
    pub(crate) running: bool,
    pub(crate) services: BTreeMap<String, Binding<Service>>,
    pub(crate) slots: Vec<Binding<Slot>>,
}

/// One downstream HTTP service under management.
pub struct Node {
    id: NodeId,
    port: String,
    health_check: String,
    transport: Option<Arc<dyn Transport>>,
    pub(crate) forwarder: Arc<dyn Forwarder>,
    pub(crate) state: Mutex<NodeState>,
    shutdown: watch::Sender<bool>,
}

impl Node {
    /// Build a node from its description. Nothing is subscribed until
    /// [`Node::start`].
    ///
    /// Slots repeating an earlier (topic, path, group) key are dropped.
    pub fn new(
        id: NodeId,
        description: NodeDescription,
        transport: Option<Arc<dyn Transport>>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        let NodeDescription {
            port,
            health_check,
            services,
            slots,
        } = description;

        let health_check = if health_check.is_empty() {
            DEFAULT_HEALTH_PATH.to_string()
        } else {
            health_check
        };

        let mut declared_slots: Vec<Binding<Slot>> = Vec::with_capacity(slots.len());
        for slot in slots {
            if !declared_slots.iter().any(|b| b.declared.same_key(&slot)) {
                declared_slots.push(Binding::inactive(slot));
            }
        }

        let state = NodeState {
            services: services
                .into_iter()
                .map(|(topic, service)| (topic, Binding::inactive(service)))
                .collect(),
            slots: declared_slots,
            ..NodeState::default()
        };

        let (shutdown, _) = watch::channel(false);
        Self {
            id,
            port,
            health_check,
            transport,
            forwarder,
            state: Mutex::new(state),
            shutdown,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn health_check(&self) -> &str {
        &self.health_check
    }

    /// Current health status.
    pub fn status(&self) -> HealthStatus {
        self.state.lock().status
    }

    /// Record a new health status, returning the previous one.
    pub fn set_status(&self, status: HealthStatus) -> HealthStatus {
        std::mem::replace(&mut self.state.lock().status, status)
    }

    /// Whether the transport connection is open.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// The node's transport.
    ///
    /// # Errors
    ///
    /// `EngineNotConfigured` if the node was built without one.
    pub fn transport(&self) -> Result<&Arc<dyn Transport>, ProxyError> {
        self.transport.as_ref().ok_or(ProxyError::EngineNotConfigured)
    }

    /// Open the transport and activate every declared service and slot.
    ///
    /// Activation is best-effort: the first failing subscription aborts the
    /// rest, and those already activated stay live.
    ///
    /// # Errors
    ///
    /// - `EngineNotConfigured` without a transport
    /// - `Transport` if the connection cannot be opened
    /// - `SubscriptionFailure` for the first binding the transport rejects
    ///
    /// A cancelled node is never reopened; `start` then does nothing.
    pub fn start(&self) -> Result<(), ProxyError> {
        let transport = self.transport()?;
        let mut state = self.state.lock();

        // Checked under the state lock: `delete_node` cancels before it stops.
        if self.is_cancelled() {
            debug!(node_id = %self.id, "Start skipped, node deleted");
            return Ok(());
        }

        transport.start()?;
        state.running = true;
        info!(node_id = %self.id, port = %self.port, "Node started");

        self.activate_all(transport, &mut state)
    }

    /// Close the transport. Declared bindings are kept for the next start.
    ///
    /// # Errors
    ///
    /// `EngineNotConfigured` without a transport, or the transport's own
    /// error. Live handles are cleared either way.
    pub fn stop(&self) -> Result<(), ProxyError> {
        let transport = self.transport()?;
        let mut state = self.state.lock();

        let result = transport.stop();
        state.running = false;
        for binding in state.services.values_mut() {
            binding.handle = None;
        }
        for binding in &mut state.slots {
            binding.handle = None;
        }

        info!(node_id = %self.id, "Node stopped");
        result.map_err(ProxyError::from)
    }

    /// Signal the node's watchdog to exit.
    pub fn cancel(&self) {
        self.shutdown.send_replace(true);
    }

    /// Whether [`Node::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that observes [`Node::cancel`].
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Declared configuration of this node.
    pub fn describe(&self) -> NodeDescription {
        NodeDescription {
            port: self.port.clone(),
            health_check: self.health_check.clone(),
            services: self.services(),
            slots: self.slots(),
        }
    }

    /// `{id, publish_port, status}` summary.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id.clone(),
            publish_port: self.port.clone(),
            status: self.status(),
        }
    }

    /// Number of bindings with a live subscription.
    pub fn live_subscriptions(&self) -> usize {
        let state = self.state.lock();
        state.services.values().filter(|b| b.handle.is_some()).count()
            + state.slots.iter().filter(|b| b.handle.is_some()).count()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("port", &self.port)
            .field("health_check", &self.health_check)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Remove a node from service.
///
/// The listen port is probed first, but a failed probe is only logged:
/// deletion always reaches `registry.del`, `stop` and watchdog cancellation.
/// Deleting an already-removed node is a no-op.
pub async fn delete_node(registry: &NodeRegistry, prober: &dyn NodeProber, node: &Node) {
    if let Err(e) = prober.check_port(node.port()).await {
        warn!(node_id = %node.id(), error = %e, "Port check failed during delete");
    }

    let removed = registry.del(node.id()).is_some();
    node.cancel();
    if let Err(e) = node.stop() {
        warn!(node_id = %node.id(), error = %e, "Stop failed during delete");
    }

    if removed {
        info!(node_id = %node.id(), "Node deleted");
    } else {
        debug!(node_id = %node.id(), "Node already deleted");
    }
}
