//! # Node Manager
//!
//! Creates nodes, owns the registry and the per-node watchdogs, and
//! implements [`NodeControl`] for the control API.
//!
//! ## Creation
//!
//! 1. Connect a transport for the node.
//! 2. Probe once. A closed port or a failed probe aborts creation; an
//!    unhealthy answer only sets the initial status.
//! 3. Register, start, then spawn the watchdog.
//!
//! If start fails the node is stopped and unregistered again.

use crate::config::ManagerConfig;
use crate::domain::{
    decide, HealthStatus, NodeDescription, NodeId, NodeSnapshot, ProbeOutcome, ServiceMap, Slot,
};
use crate::error::ProxyError;
use crate::ports::{Forwarder, NodeControl, NodeProber, TransportFactory};
use crate::service::node::{delete_node, Node};
use crate::service::registry::NodeRegistry;
use crate::service::relay::RequestRelay;
use crate::service::watchdog::Watchdog;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Request, RequestResponse};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long shutdown waits for each watchdog to exit.
const WATCHDOG_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Orchestrates node creation, deletion and monitoring.
pub struct NodeManager {
    registry: Arc<NodeRegistry>,
    transports: Arc<dyn TransportFactory>,
    prober: Arc<dyn NodeProber>,
    forwarder: Arc<dyn Forwarder>,
    relay: RequestRelay,
    config: ManagerConfig,
    watchdogs: Mutex<HashMap<NodeId, JoinHandle<()>>>,
}

impl NodeManager {
    pub fn new(
        config: ManagerConfig,
        transports: Arc<dyn TransportFactory>,
        prober: Arc<dyn NodeProber>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            registry: Arc::new(NodeRegistry::new()),
            transports,
            prober,
            forwarder,
            relay: RequestRelay::new(config.relay_timeout, config.max_relay_timeout),
            config,
            watchdogs: Mutex::new(HashMap::new()),
        }
    }

    /// The registry shared with every watchdog.
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Look up a registered node.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if `id` is not registered.
    pub fn get_node(&self, id: &NodeId) -> Result<Arc<Node>, ProxyError> {
        self.registry.get(id)
    }

    /// Create, start and monitor a node.
    ///
    /// # Errors
    ///
    /// - `Transport` if no transport can be connected
    /// - `ProbeUnreachable` if the port is closed or the probe fails
    /// - any error from [`Node::start`]
    pub async fn create(&self, description: NodeDescription) -> Result<Arc<Node>, ProxyError> {
        let transport = self.transports.connect(&self.config.bus_address)?;
        let id = NodeId::generate(self.config.id_length);
        let node = Arc::new(Node::new(
            id.clone(),
            description,
            Some(transport),
            self.forwarder.clone(),
        ));

        let outcome = self
            .prober
            .probe(node.port(), node.health_check())
            .await
            .map_err(|e| {
                warn!(port = %node.port(), error = %e, "Initial probe failed");
                ProxyError::from(e)
            })?;
        if outcome == ProbeOutcome::PortClosed {
            return Err(ProxyError::ProbeUnreachable {
                port: node.port().to_string(),
                reason: "listen port closed".to_string(),
            });
        }
        let (status, _) = decide(false, outcome);
        node.set_status(status);

        self.registry.put(id.clone(), node.clone());
        if let Err(e) = node.start() {
            warn!(node_id = %id, error = %e, "Start failed, discarding node");
            if let Err(stop_err) = node.stop() {
                debug!(node_id = %id, error = %stop_err, "Stop after failed start");
            }
            self.registry.del(&id);
            node.cancel();
            return Err(e);
        }

        let watchdog = Watchdog::new(
            node.clone(),
            self.registry.clone(),
            self.prober.clone(),
            self.config.watchdog_interval,
        );
        {
            let mut watchdogs = self.watchdogs.lock();
            watchdogs.retain(|_, handle| !handle.is_finished());
            watchdogs.insert(id.clone(), watchdog.spawn());
        }

        info!(node_id = %id, port = %node.port(), status = %status, "Node created");
        Ok(node)
    }

    /// Delete a node if present.
    pub async fn delete(&self, id: &NodeId) {
        match self.registry.get(id) {
            Ok(node) => delete_node(&self.registry, self.prober.as_ref(), &node).await,
            Err(_) => debug!(node_id = %id, "Delete of unknown node"),
        }
        self.watchdogs.lock().remove(id);
    }

    /// Stop every node and wait for its watchdog to exit.
    pub async fn shutdown(&self) {
        let nodes = self.registry.drain();
        for node in &nodes {
            node.cancel();
            if let Err(e) = node.stop() {
                warn!(node_id = %node.id(), error = %e, "Stop failed during shutdown");
            }
        }

        let handles: Vec<_> = self.watchdogs.lock().drain().collect();
        for (id, handle) in handles {
            if tokio::time::timeout(WATCHDOG_JOIN_TIMEOUT, handle)
                .await
                .is_err()
            {
                warn!(node_id = %id, "Watchdog did not exit in time");
            }
        }
        info!(nodes = nodes.len(), "Node manager shut down");
    }

    /// Number of watchdogs still running. Handles of exited watchdogs are
    /// dropped here.
    pub fn active_watchdogs(&self) -> usize {
        let mut watchdogs = self.watchdogs.lock();
        watchdogs.retain(|_, handle| !handle.is_finished());
        watchdogs.len()
    }

    fn healthy_node(&self, id: &NodeId) -> Result<Option<Arc<Node>>, ProxyError> {
        let node = self.registry.get(id)?;
        Ok((node.status() == HealthStatus::Healthy).then_some(node))
    }
}

#[async_trait]
impl NodeControl for NodeManager {
    async fn create_node(&self, description: NodeDescription) -> Result<NodeSnapshot, ProxyError> {
        self.create(description).await.map(|node| node.snapshot())
    }

    async fn delete_node(&self, id: &NodeId) -> Result<(), ProxyError> {
        self.delete(id).await;
        Ok(())
    }

    fn list_nodes(&self) -> Vec<NodeSnapshot> {
        let mut nodes: Vec<_> = self.registry.list().iter().map(|n| n.snapshot()).collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    fn describe_node(&self, id: &NodeId) -> Result<NodeDescription, ProxyError> {
        Ok(self.registry.get(id)?.describe())
    }

    fn list_services(&self, id: &NodeId) -> Result<ServiceMap, ProxyError> {
        Ok(self
            .healthy_node(id)?
            .map(|node| node.services())
            .unwrap_or_default())
    }

    fn add_services(&self, id: &NodeId, services: ServiceMap) -> Result<(), ProxyError> {
        self.registry.get(id)?.add_services(services)
    }

    fn remove_services(&self, id: &NodeId, services: &ServiceMap) -> Result<(), ProxyError> {
        self.registry.get(id)?.remove_services(services);
        Ok(())
    }

    fn list_slots(&self, id: &NodeId) -> Result<Vec<Slot>, ProxyError> {
        Ok(self
            .healthy_node(id)?
            .map(|node| node.slots())
            .unwrap_or_default())
    }

    fn add_slot(&self, id: &NodeId, slot: Slot) -> Result<(), ProxyError> {
        self.registry.get(id)?.add_slot(slot)
    }

    fn remove_slot(&self, id: &NodeId, slot: &Slot) -> Result<(), ProxyError> {
        self.registry.get(id)?.remove_slot(slot).map(|_| ())
    }

    async fn request(&self, id: &NodeId, request: Request) -> Result<RequestResponse, ProxyError> {
        let node = self.registry.get(id)?;
        Ok(self.relay.relay(&node, &request).await)
    }
}
