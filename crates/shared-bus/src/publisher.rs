//! # Bus Publisher
//!
//! The in-memory bus: topic table, request/reply and signal delivery.

use crate::connection::BusConnection;
use crate::events::{BusMessage, DeliveryKind, HandlerOptions};
use crate::subscriber::{BusError, Delivery, MessageHandler, Subscriber, SubscriptionId};
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::RwLock;
use serde_json::Value;
use shared_types::Reply;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// In-memory implementation of the topic bus.
///
/// Suitable for single-process operation; distributed deployments would use
/// a different implementation (e.g., Redis, NATS).
pub struct InMemoryBus {
    /// Live subscriptions by topic.
    topics: RwLock<HashMap<String, Vec<Subscriber>>>,

    /// Next subscription id.
    next_id: AtomicU64,

    /// Round-robin cursor for responder and group selection.
    cursor: AtomicUsize,

    /// Total requests and signals published.
    messages_published: AtomicU64,

    /// Per-subscriber buffer capacity.
    capacity: usize,
}

impl InMemoryBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with the given per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            cursor: AtomicUsize::new(0),
            messages_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Open a connection owned by one client.
    ///
    /// The connection starts stopped; call [`BusConnection::start`] first.
    #[must_use]
    pub fn connect(self: &Arc<Self>, address: impl Into<String>) -> BusConnection {
        BusConnection::new(Arc::clone(self), address.into())
    }

    /// Register a handler on `topic`.
    pub(crate) fn subscribe(
        &self,
        topic: &str,
        kind: DeliveryKind,
        handler: Arc<dyn MessageHandler>,
        options: HandlerOptions,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber::spawn(id, kind, handler, options, self.capacity);

        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(subscriber);

        debug!(topic = topic, subscription = %id, kind = ?kind, "Subscription created");
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub(crate) fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            topics.remove(topic);
        }

        if removed {
            debug!(topic = topic, subscription = %id, "Subscription dropped");
        }
        removed
    }

    /// Publish a request on `topic` and await exactly one reply.
    ///
    /// # Errors
    ///
    /// - `NoResponder` if no reply subscription exists on the topic
    /// - `Unavailable` if the chosen responder cannot accept the delivery
    /// - `NoReply` if the responder abandoned the request
    /// - `Timeout` if no reply arrived within `timeout`
    pub async fn request(
        &self,
        topic: &str,
        data: Value,
        timeout: Duration,
    ) -> Result<Reply, BusError> {
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let sender = self.pick_responder(topic).ok_or_else(|| BusError::NoResponder {
            topic: topic.to_string(),
        })?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let delivery = Delivery {
            message: BusMessage::new(topic, data),
            reply: Some(reply_tx),
        };
        sender.try_send(delivery).map_err(|e| {
            warn!(topic = topic, error = %e, "Request delivery rejected");
            BusError::Unavailable {
                topic: topic.to_string(),
            }
        })?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => {
                debug!(topic = topic, code = reply.code, "Request answered");
                Ok(reply)
            }
            Ok(Err(_)) => Err(BusError::NoReply {
                topic: topic.to_string(),
            }),
            Err(_) => Err(BusError::Timeout {
                topic: topic.to_string(),
            }),
        }
    }

    /// Publish a fire-and-forget message on `topic`.
    ///
    /// Every ungrouped slot subscriber receives it, plus one member of each
    /// group. Returns the number of deliveries queued.
    pub fn signal(&self, topic: &str, data: Value) -> usize {
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let targets = self.pick_slots(topic);
        let mut delivered = 0;
        for target in targets {
            let delivery = Delivery {
                message: BusMessage::new(topic, data.clone()),
                reply: None,
            };
            match target.try_send(delivery) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(topic = topic, error = %e, "Signal dropped"),
            }
        }

        if delivered == 0 {
            debug!(topic = topic, "Signal dropped (no slot subscribers)");
        }
        delivered
    }

    /// Number of live subscriptions on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    /// Total requests and signals published.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Per-subscriber buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn pick_responder(&self, topic: &str) -> Option<mpsc::Sender<Delivery>> {
        let topics = self.topics.read();
        let responders: Vec<&Subscriber> = topics
            .get(topic)?
            .iter()
            .filter(|s| s.kind == DeliveryKind::Reply)
            .collect();
        if responders.is_empty() {
            return None;
        }
        let pick = self.cursor.fetch_add(1, Ordering::Relaxed) % responders.len();
        Some(responders[pick].sender.clone())
    }

    fn pick_slots(&self, topic: &str) -> Vec<mpsc::Sender<Delivery>> {
        let topics = self.topics.read();
        let Some(subscribers) = topics.get(topic) else {
            return Vec::new();
        };

        let mut targets = Vec::new();
        let mut groups: BTreeMap<&str, Vec<&Subscriber>> = BTreeMap::new();
        for subscriber in subscribers.iter().filter(|s| s.kind == DeliveryKind::Slot) {
            match subscriber.group.as_deref() {
                None => targets.push(subscriber.sender.clone()),
                Some(group) => groups.entry(group).or_default().push(subscriber),
            }
        }

        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        for members in groups.values() {
            targets.push(members[cursor % members.len()].sender.clone());
        }
        targets
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}
