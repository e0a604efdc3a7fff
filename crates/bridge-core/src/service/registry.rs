//! Node registry: the single authority on which nodes exist.
//!
//! Every operation is one short critical section over the map. No I/O is
//! performed while the lock is held.

use crate::domain::NodeId;
use crate::error::ProxyError;
use crate::service::node::Node;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Concurrency-safe map from node id to node.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: Mutex<HashMap<NodeId, Arc<Node>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the node under `id`.
    pub fn put(&self, id: NodeId, node: Arc<Node>) {
        self.nodes.lock().insert(id, node);
    }

    /// Look up a node.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if `id` is not registered.
    pub fn get(&self, id: &NodeId) -> Result<Arc<Node>, ProxyError> {
        self.nodes
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| ProxyError::NodeNotFound(id.clone()))
    }

    /// Remove a node, returning it if it was present.
    pub fn del(&self, id: &NodeId) -> Option<Arc<Node>> {
        self.nodes.lock().remove(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }

    /// All registered nodes, in no particular order.
    pub fn list(&self) -> Vec<Arc<Node>> {
        self.nodes.lock().values().cloned().collect()
    }

    /// Remove and return every node.
    pub fn drain(&self) -> Vec<Arc<Node>> {
        self.nodes.lock().drain().map(|(_, node)| node).collect()
    }
}
