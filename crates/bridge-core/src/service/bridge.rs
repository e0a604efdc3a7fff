//! # Message Bridge
//!
//! The bus handler bound to every live subscription. It decodes the bus
//! envelope, POSTs it to the node and, for services, hands the node's JSON
//! answer back to the transport as the reply.
//!
//! Failures are logged and the message is dropped. A requester waiting on a
//! service observes a timeout, never a fabricated error payload.

use crate::error::{ForwardError, ProxyError};
use crate::ports::{BusHandler, Forwarder, HandlerKind};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::Envelope;
use std::sync::Arc;
use tracing::{debug, warn};

/// Forwards bus messages for one binding to one node.
pub struct MessageBridge {
    kind: HandlerKind,
    port: String,
    path: String,
    forwarder: Arc<dyn Forwarder>,
}

impl MessageBridge {
    /// Bridge for a request/reply binding.
    pub fn service(port: &str, path: &str, forwarder: Arc<dyn Forwarder>) -> Self {
        Self::new(HandlerKind::Service, port, path, forwarder)
    }

    /// Bridge for a fire-and-forget binding.
    pub fn slot(port: &str, path: &str, forwarder: Arc<dyn Forwarder>) -> Self {
        Self::new(HandlerKind::Slot, port, path, forwarder)
    }

    fn new(kind: HandlerKind, port: &str, path: &str, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            kind,
            port: port.to_string(),
            path: path.to_string(),
            forwarder,
        }
    }

    async fn forward(&self, payload: Value) -> Result<Value, ForwardError> {
        let envelope =
            Envelope::from_value(payload).map_err(|e| ForwardError::Envelope(e.to_string()))?;
        self.forwarder.forward(&self.port, &self.path, &envelope).await
    }
}

#[async_trait]
impl BusHandler for MessageBridge {
    fn kind(&self) -> HandlerKind {
        self.kind
    }

    async fn handle(&self, payload: Value) -> Option<Value> {
        match self.forward(payload).await {
            Ok(reply) => {
                debug!(port = %self.port, path = %self.path, kind = ?self.kind, "Message forwarded");
                match self.kind {
                    HandlerKind::Service => Some(reply),
                    HandlerKind::Slot => None,
                }
            }
            Err(e) => {
                let err = ProxyError::from(e);
                warn!(port = %self.port, path = %self.path, error = %err, "Bridge dropped message");
                None
            }
        }
    }
}
