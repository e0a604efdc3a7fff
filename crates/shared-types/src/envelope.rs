//! # Bus Envelopes
//!
//! The two shapes that travel over the bus:
//!
//! - [`Envelope`]: what a publisher puts on a topic and what a downstream node
//!   receives as its POST body (`{"data": ..., "handler_path": ...}`).
//! - [`Reply`]: what a responder puts back on the bus for a request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status code carried by a successful reply.
pub const REPLY_OK: u16 = 200;

/// Message published on a topic and forwarded verbatim to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Opaque payload.
    #[serde(default)]
    pub data: Value,

    /// Return address of the requester (the listen port of the node that
    /// issued the request).
    #[serde(default)]
    pub handler_path: String,
}

impl Envelope {
    /// Create a new envelope.
    pub fn new(data: Value, handler_path: impl Into<String>) -> Self {
        Self {
            data,
            handler_path: handler_path.into(),
        }
    }

    /// Decode an envelope from a raw bus payload.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Encode the envelope into a raw bus payload.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Reply published back to a requester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Reply payload.
    #[serde(default)]
    pub data: Value,

    /// Status code (200 on success).
    pub code: u16,
}

impl Reply {
    /// A successful reply carrying `data`.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            code: REPLY_OK,
        }
    }

    /// Whether the reply carries a success code.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == REPLY_OK
    }
}
