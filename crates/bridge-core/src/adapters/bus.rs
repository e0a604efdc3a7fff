//! Transport adapter over the in-memory bus.
//!
//! Each node gets its own [`BusConnection`]; stopping the transport drops
//! every subscription the node holds.

use crate::error::TransportError;
use crate::ports::{
    BusHandler, HandlerKind, SubscribeOptions, SubscriptionHandle, Transport, TransportFactory,
};
use async_trait::async_trait;
use serde_json::Value;
use shared_bus::{
    BusConnection, BusError, BusMessage, HandlerOptions, InMemoryBus, MessageHandler,
    SubscriptionId,
};
use shared_types::Reply;
use std::sync::Arc;
use std::time::Duration;

impl From<BusError> for TransportError {
    fn from(e: BusError) -> Self {
        match e {
            BusError::NotConnected => Self::NotConnected,
            BusError::NoResponder { topic } => Self::NoResponder { topic },
            BusError::Timeout { topic } => Self::Timeout { topic },
            BusError::NoReply { topic } => Self::NoReply { topic },
            BusError::Unavailable { topic } => Self::Rejected {
                topic,
                reason: "subscriber unavailable".to_string(),
            },
        }
    }
}

/// Opens one bus connection per node.
pub struct BusTransportFactory {
    bus: Arc<InMemoryBus>,
}

impl BusTransportFactory {
    pub fn new(bus: Arc<InMemoryBus>) -> Self {
        Self { bus }
    }
}

impl TransportFactory for BusTransportFactory {
    fn connect(&self, address: &str) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(BusTransport {
            connection: self.bus.connect(address),
        }))
    }
}

/// [`Transport`] backed by a [`BusConnection`].
pub struct BusTransport {
    connection: BusConnection,
}

/// Adapts a [`BusHandler`] to the bus callback.
struct HandlerShim(Arc<dyn BusHandler>);

#[async_trait]
impl MessageHandler for HandlerShim {
    async fn handle(&self, message: BusMessage) -> Option<Value> {
        let reply = self.0.handle(message.data).await;
        match self.0.kind() {
            HandlerKind::Service => reply,
            HandlerKind::Slot => None,
        }
    }
}

fn bus_options(options: SubscribeOptions) -> HandlerOptions {
    HandlerOptions::new(&options.group, options.timeout)
}

fn release(removed: bool, topic: &str) -> Result<(), TransportError> {
    if removed {
        Ok(())
    } else {
        Err(TransportError::UnknownSubscription {
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl Transport for BusTransport {
    fn start(&self) -> Result<(), TransportError> {
        self.connection.start();
        Ok(())
    }

    fn stop(&self) -> Result<(), TransportError> {
        self.connection.stop();
        Ok(())
    }

    fn reply_to(
        &self,
        topic: &str,
        handler: Arc<dyn BusHandler>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionHandle, TransportError> {
        let id = self
            .connection
            .reply_to(topic, Arc::new(HandlerShim(handler)), bus_options(options))?;
        Ok(SubscriptionHandle(id.as_u64()))
    }

    fn slot(
        &self,
        topic: &str,
        handler: Arc<dyn BusHandler>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionHandle, TransportError> {
        let id = self
            .connection
            .slot(topic, Arc::new(HandlerShim(handler)), bus_options(options))?;
        Ok(SubscriptionHandle(id.as_u64()))
    }

    fn unsubscribe_reply(
        &self,
        topic: &str,
        handle: SubscriptionHandle,
    ) -> Result<(), TransportError> {
        release(
            self.connection
                .unsubscribe_reply(topic, SubscriptionId::from_u64(handle.0)),
            topic,
        )
    }

    fn unsubscribe_slot(
        &self,
        topic: &str,
        handle: SubscriptionHandle,
    ) -> Result<(), TransportError> {
        release(
            self.connection
                .unsubscribe_slot(topic, SubscriptionId::from_u64(handle.0)),
            topic,
        )
    }

    async fn request(
        &self,
        topic: &str,
        message: Value,
        timeout: Duration,
    ) -> Result<Reply, TransportError> {
        Ok(self.connection.request(topic, message, timeout).await?)
    }
}
