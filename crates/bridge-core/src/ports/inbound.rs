//! Inbound Ports (Driving Ports)
//!
//! The operations the control API drives.

use crate::domain::{NodeDescription, NodeId, NodeSnapshot, ServiceMap, Slot};
use crate::error::ProxyError;
use async_trait::async_trait;
use shared_types::{Request, RequestResponse};

/// Node control plane API.
#[async_trait]
pub trait NodeControl: Send + Sync {
    /// Probe, register and start a node, then begin monitoring it.
    async fn create_node(&self, description: NodeDescription) -> Result<NodeSnapshot, ProxyError>;

    /// Delete a node. Unknown ids succeed.
    async fn delete_node(&self, id: &NodeId) -> Result<(), ProxyError>;

    /// Summaries of every registered node.
    fn list_nodes(&self) -> Vec<NodeSnapshot>;

    /// Declared configuration of a node.
    fn describe_node(&self, id: &NodeId) -> Result<NodeDescription, ProxyError>;

    /// Declared services; empty unless the node is healthy.
    fn list_services(&self, id: &NodeId) -> Result<ServiceMap, ProxyError>;

    /// Add services in order, stopping at the first failure.
    fn add_services(&self, id: &NodeId, services: ServiceMap) -> Result<(), ProxyError>;

    /// Remove the listed topics.
    fn remove_services(&self, id: &NodeId, services: &ServiceMap) -> Result<(), ProxyError>;

    /// Declared slots; empty unless the node is healthy.
    fn list_slots(&self, id: &NodeId) -> Result<Vec<Slot>, ProxyError>;

    /// Add or replace a slot.
    fn add_slot(&self, id: &NodeId, slot: Slot) -> Result<(), ProxyError>;

    /// Remove one slot, or every slot on the topic when `slot.path` is empty.
    fn remove_slot(&self, id: &NodeId, slot: &Slot) -> Result<(), ProxyError>;

    /// Relay an ad-hoc request through the node's transport.
    async fn request(&self, id: &NodeId, request: Request) -> Result<RequestResponse, ProxyError>;
}
