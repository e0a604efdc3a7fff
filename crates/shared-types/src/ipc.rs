//! # Relay and API Payloads
//!
//! Bodies exchanged between callers of the control API and the request relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a successful control API call.
pub const STATUS_OK: &str = "ok";

/// An ad-hoc request to publish on the bus and await one reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Topic to publish on.
    pub topic: String,

    /// Composition descriptor, carried through untouched.
    #[serde(default)]
    pub composition: Value,

    /// Message data.
    #[serde(default)]
    pub message: Value,

    /// Timeout in seconds; 0 selects the configured default.
    #[serde(default)]
    pub timeout: u64,
}

/// Result of a relayed request.
///
/// The default value (`messages: null, code: 0, length: 0`) means "no answer".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestResponse {
    /// Reply payload.
    #[serde(default)]
    pub messages: Value,

    /// Reply status code.
    #[serde(default)]
    pub code: u16,

    /// Number of replies received.
    #[serde(default)]
    pub length: usize,
}

impl RequestResponse {
    /// Whether this is the empty "no answer" response.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// `{"status": "ok" | <error text>}` envelope returned by mutating API calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// `"ok"` or the error text.
    pub status: String,
}

impl StatusResponse {
    /// The success envelope.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
        }
    }

    /// Build the envelope from an operation result.
    pub fn from_result<T, E: std::fmt::Display>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self {
                status: e.to_string(),
            },
        }
    }
}
