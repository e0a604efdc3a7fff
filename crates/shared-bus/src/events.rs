//! # Bus Messages
//!
//! Message and subscription option types that flow through the bus.

use crate::DEFAULT_HANDLER_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A message delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Raw payload.
    pub data: Value,
}

impl BusMessage {
    /// Create a new message.
    pub fn new(topic: impl Into<String>, data: Value) -> Self {
        Self {
            topic: topic.into(),
            data,
        }
    }
}

/// How a subscription takes part in delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryKind {
    /// Answers requests; exactly one reply subscriber handles each request.
    Reply,
    /// Observes signals; the handler's result is discarded.
    Slot,
}

/// Options attached to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Consumer group for load-balanced delivery.
    pub group: Option<String>,
    /// Upper bound on a single handler invocation.
    pub timeout: Duration,
}

impl HandlerOptions {
    /// Build options from a group name (empty means ungrouped) and a timeout.
    ///
    /// A zero timeout selects the default.
    #[must_use]
    pub fn new(group: &str, timeout: Duration) -> Self {
        let group = if group.is_empty() {
            None
        } else {
            Some(group.to_string())
        };
        let timeout = if timeout.is_zero() {
            Duration::from_secs(DEFAULT_HANDLER_TIMEOUT_SECS)
        } else {
            timeout
        };
        Self { group, timeout }
    }
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self::new("", Duration::ZERO)
    }
}
