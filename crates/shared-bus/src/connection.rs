//! # Bus Connection
//!
//! A per-owner handle onto the [`InMemoryBus`]. The connection remembers every
//! subscription it created so that [`BusConnection::stop`] can drop them all.

use crate::events::{DeliveryKind, HandlerOptions};
use crate::publisher::InMemoryBus;
use crate::subscriber::{BusError, MessageHandler, SubscriptionId};
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::Reply;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Connection owned by a single client of the bus.
pub struct BusConnection {
    bus: Arc<InMemoryBus>,
    address: String,
    connected: AtomicBool,
    owned: Mutex<Vec<(String, SubscriptionId)>>,
}

impl BusConnection {
    pub(crate) fn new(bus: Arc<InMemoryBus>, address: String) -> Self {
        Self {
            bus,
            address,
            connected: AtomicBool::new(false),
            owned: Mutex::new(Vec::new()),
        }
    }

    /// Address label this connection was opened with.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the connection is started.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Start the connection. Starting twice is a no-op.
    pub fn start(&self) {
        if !self.connected.swap(true, Ordering::AcqRel) {
            info!(address = %self.address, "Bus connection started");
        }
    }

    /// Stop the connection and drop every subscription it owns.
    ///
    /// Returns the number of subscriptions dropped.
    pub fn stop(&self) -> usize {
        let was_connected = self.connected.swap(false, Ordering::AcqRel);
        let owned = std::mem::take(&mut *self.owned.lock());
        let dropped = owned
            .iter()
            .filter(|(topic, id)| self.bus.unsubscribe(topic, *id))
            .count();
        if was_connected {
            info!(address = %self.address, dropped, "Bus connection stopped");
        }
        dropped
    }

    /// Subscribe `handler` to answer requests on `topic`.
    ///
    /// # Errors
    ///
    /// `NotConnected` if the connection is not started.
    pub fn reply_to(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
        options: HandlerOptions,
    ) -> Result<SubscriptionId, BusError> {
        self.subscribe(topic, DeliveryKind::Reply, handler, options)
    }

    /// Subscribe `handler` to observe signals on `topic`.
    ///
    /// # Errors
    ///
    /// `NotConnected` if the connection is not started.
    pub fn slot(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
        options: HandlerOptions,
    ) -> Result<SubscriptionId, BusError> {
        self.subscribe(topic, DeliveryKind::Slot, handler, options)
    }

    /// Drop a reply subscription. Returns `false` if it was already gone.
    pub fn unsubscribe_reply(&self, topic: &str, id: SubscriptionId) -> bool {
        self.release(topic, id)
    }

    /// Drop a slot subscription. Returns `false` if it was already gone.
    pub fn unsubscribe_slot(&self, topic: &str, id: SubscriptionId) -> bool {
        self.release(topic, id)
    }

    /// Publish a request and await its reply.
    ///
    /// # Errors
    ///
    /// `NotConnected` if the connection is not started, otherwise whatever
    /// [`InMemoryBus::request`] reports.
    pub async fn request(
        &self,
        topic: &str,
        data: Value,
        timeout: Duration,
    ) -> Result<Reply, BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        self.bus.request(topic, data, timeout).await
    }

    /// Publish a fire-and-forget signal.
    ///
    /// # Errors
    ///
    /// `NotConnected` if the connection is not started.
    pub fn signal(&self, topic: &str, data: Value) -> Result<usize, BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        Ok(self.bus.signal(topic, data))
    }

    /// Number of live subscriptions owned by this connection.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.owned.lock().len()
    }

    fn subscribe(
        &self,
        topic: &str,
        kind: DeliveryKind,
        handler: Arc<dyn MessageHandler>,
        options: HandlerOptions,
    ) -> Result<SubscriptionId, BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        let id = self.bus.subscribe(topic, kind, handler, options);
        self.owned.lock().push((topic.to_string(), id));
        Ok(id)
    }

    fn release(&self, topic: &str, id: SubscriptionId) -> bool {
        self.owned
            .lock()
            .retain(|(owned_topic, owned_id)| !(owned_topic == topic && *owned_id == id));
        let removed = self.bus.unsubscribe(topic, id);
        if !removed {
            debug!(address = %self.address, topic = topic, subscription = %id, "Subscription already gone");
        }
        removed
    }
}

impl Drop for BusConnection {
    fn drop(&mut self) {
        self.stop();
    }
}
