//! Outbound Ports (Driven Ports)
//!
//! Dependencies the bridge needs from the outside world: the pub/sub
//! transport, a way to probe node health, and a way to forward a message to a
//! node over HTTP.

use crate::domain::ProbeOutcome;
use crate::error::{ForwardError, ProbeError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::{Envelope, Reply};
use std::sync::Arc;
use std::time::Duration;

/// Handle identifying one live transport subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Options passed to the transport when subscribing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Consumer group (empty for none).
    pub group: String,
    /// Handler timeout (zero selects the transport default).
    pub timeout: Duration,
}

impl SubscribeOptions {
    /// Options from a binding's group and timeout in seconds.
    #[must_use]
    pub fn new(group: &str, timeout_secs: u64) -> Self {
        Self {
            group: group.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Whether a handler answers requests or only observes signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Service,
    Slot,
}

/// Callback the transport invokes for each matched bus message.
///
/// Service handlers return `Some(reply)`; returning `None` abandons the
/// request. Slot handler results are ignored.
#[async_trait]
pub trait BusHandler: Send + Sync {
    /// Reply or fire-and-forget.
    fn kind(&self) -> HandlerKind;

    /// Handle one raw bus payload.
    async fn handle(&self, payload: Value) -> Option<Value>;
}

/// Pub/sub connection owned by a single node (Driven Port).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection.
    fn start(&self) -> Result<(), TransportError>;

    /// Close the connection, dropping every live subscription.
    fn stop(&self) -> Result<(), TransportError>;

    /// Subscribe `handler` to answer requests on `topic`.
    fn reply_to(
        &self,
        topic: &str,
        handler: Arc<dyn BusHandler>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionHandle, TransportError>;

    /// Subscribe `handler` to observe signals on `topic`.
    fn slot(
        &self,
        topic: &str,
        handler: Arc<dyn BusHandler>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionHandle, TransportError>;

    /// Drop a reply subscription.
    fn unsubscribe_reply(
        &self,
        topic: &str,
        handle: SubscriptionHandle,
    ) -> Result<(), TransportError>;

    /// Drop a slot subscription.
    fn unsubscribe_slot(&self, topic: &str, handle: SubscriptionHandle)
        -> Result<(), TransportError>;

    /// Publish a request and await exactly one reply.
    async fn request(
        &self,
        topic: &str,
        message: Value,
        timeout: Duration,
    ) -> Result<Reply, TransportError>;
}

/// Opens transport connections.
pub trait TransportFactory: Send + Sync {
    /// Connect to the bus at `address`. The connection starts stopped.
    fn connect(&self, address: &str) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Health probing of downstream nodes (Driven Port).
#[async_trait]
pub trait NodeProber: Send + Sync {
    /// Check that something listens on `port`.
    async fn check_port(&self, port: &str) -> Result<(), ProbeError>;

    /// Probe the listen port, then the health path.
    async fn probe(&self, port: &str, health_path: &str) -> Result<ProbeOutcome, ProbeError>;
}

/// Delivery of bus messages to downstream nodes (Driven Port).
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// POST `envelope` to `path` on the node at `port` and decode the JSON reply.
    async fn forward(
        &self,
        port: &str,
        path: &str,
        envelope: &Envelope,
    ) -> Result<Value, ForwardError>;
}
