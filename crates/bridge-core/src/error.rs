//! Error types for the node bridge

use crate::domain::NodeId;
use thiserror::Error;

/// Errors surfaced by node operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Transport engine not configured")]
    EngineNotConfigured,

    #[error("Subscription on topic {topic} failed: {source}")]
    SubscriptionFailure {
        topic: String,
        #[source]
        source: TransportError,
    },

    #[error("Node port {port} unreachable: {reason}")]
    ProbeUnreachable { port: String, reason: String },

    #[error("Node on port {port} is unhealthy")]
    ProbeUnhealthy { port: String },

    #[error("Forwarding failed: {0}")]
    BridgeForwardFailure(String),

    #[error("No reply on topic {topic} within {timeout_secs}s")]
    RelayTimeout { topic: String, timeout_secs: u64 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<ProbeError> for ProxyError {
    fn from(e: ProbeError) -> Self {
        match e {
            ProbeError::Unreachable { port, reason }
            | ProbeError::Request { port, reason }
            | ProbeError::Body { port, reason } => Self::ProbeUnreachable { port, reason },
        }
    }
}

impl From<ForwardError> for ProxyError {
    fn from(e: ForwardError) -> Self {
        Self::BridgeForwardFailure(e.to_string())
    }
}

/// Errors from the pub/sub transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Transport not connected")]
    NotConnected,

    #[error("No responder on topic {topic}")]
    NoResponder { topic: String },

    #[error("Request on topic {topic} timed out")]
    Timeout { topic: String },

    #[error("Responder on topic {topic} abandoned the request")]
    NoReply { topic: String },

    #[error("Topic {topic} rejected the message: {reason}")]
    Rejected { topic: String, reason: String },

    #[error("Unknown subscription on topic {topic}")]
    UnknownSubscription { topic: String },
}

/// Errors from node health probes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Port {port} unreachable: {reason}")]
    Unreachable { port: String, reason: String },

    #[error("Probe of port {port} failed: {reason}")]
    Request { port: String, reason: String },

    #[error("Unreadable health response from port {port}: {reason}")]
    Body { port: String, reason: String },
}

/// Errors from forwarding a bus message to a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    #[error("POST {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Invalid JSON from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Undecodable envelope: {0}")]
    Envelope(String),
}
