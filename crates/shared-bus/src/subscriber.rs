//! # Subscriber
//!
//! Defines the subscription side of the bus: the handler capability, the
//! subscription handle, and the per-subscription dispatch task.

use crate::events::{BusMessage, DeliveryKind, HandlerOptions};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::Reply;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Errors from bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The connection is not started (or has been stopped).
    #[error("Bus connection not started")]
    NotConnected,

    /// Nobody answers requests on the topic.
    #[error("No responder subscribed to topic {topic}")]
    NoResponder { topic: String },

    /// The responder did not answer within the request timeout.
    #[error("Request on topic {topic} timed out")]
    Timeout { topic: String },

    /// The responder abandoned the request without replying.
    #[error("Responder on topic {topic} returned no reply")]
    NoReply { topic: String },

    /// The subscriber's delivery buffer is full or closed.
    #[error("Delivery to topic {topic} rejected: subscriber unavailable")]
    Unavailable { topic: String },
}

/// Callback invoked for every message delivered to a subscription.
///
/// For [`DeliveryKind::Reply`] subscriptions, `Some(value)` becomes the reply;
/// `None` abandons the request. For slot subscriptions the result is ignored.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one delivered message.
    async fn handle(&self, message: BusMessage) -> Option<Value>;
}

/// Opaque handle identifying one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// Rebuild an id from its raw value.
    #[must_use]
    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One queued delivery.
pub(crate) struct Delivery {
    pub(crate) message: BusMessage,
    pub(crate) reply: Option<oneshot::Sender<Reply>>,
}

/// Registry entry for a live subscription.
pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    pub(crate) kind: DeliveryKind,
    pub(crate) group: Option<String>,
    pub(crate) sender: mpsc::Sender<Delivery>,
}

impl Subscriber {
    /// Create the entry and spawn its dispatch task.
    ///
    /// The task ends when the entry (and so the sender) is dropped.
    pub(crate) fn spawn(
        id: SubscriptionId,
        kind: DeliveryKind,
        handler: Arc<dyn MessageHandler>,
        options: HandlerOptions,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        tokio::spawn(dispatch(id, handler, options.clone(), receiver));
        Self {
            id,
            kind,
            group: options.group,
            sender,
        }
    }
}

/// Pull deliveries off the queue and run each handler invocation concurrently.
async fn dispatch(
    id: SubscriptionId,
    handler: Arc<dyn MessageHandler>,
    options: HandlerOptions,
    mut receiver: mpsc::Receiver<Delivery>,
) {
    while let Some(delivery) = receiver.recv().await {
        let handler = Arc::clone(&handler);
        let timeout = options.timeout;
        tokio::spawn(async move {
            let topic = delivery.message.topic.clone();
            match tokio::time::timeout(timeout, handler.handle(delivery.message)).await {
                Ok(Some(data)) => {
                    if let Some(reply) = delivery.reply {
                        if reply.send(Reply::ok(data)).is_err() {
                            debug!(subscription = %id, topic = %topic, "Requester went away before reply");
                        }
                    }
                }
                Ok(None) => {
                    debug!(subscription = %id, topic = %topic, "Handler produced no reply");
                }
                Err(_) => {
                    warn!(
                        subscription = %id,
                        topic = %topic,
                        timeout_ms = timeout.as_millis(),
                        "Handler timed out"
                    );
                }
            }
        });
    }
    debug!(subscription = %id, "Subscription dispatcher stopped");
}
