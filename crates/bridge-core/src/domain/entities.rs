//! Domain entities: node identity, health status and topic bindings.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Alphabet used for generated node identifiers.
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Health check path used when a node does not declare one.
pub const DEFAULT_HEALTH_PATH: &str = "/health_check";

/// Opaque node identifier, unique for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a random identifier of `len` characters from `[a-z0-9]`.
    #[must_use]
    pub fn generate(len: usize) -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..len)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    /// Borrow the identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Observed health of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Never checked.
    #[default]
    Unknown,
    /// Reachable and the health endpoint answered "OK".
    Healthy,
    /// Reachable but the health endpoint signalled failure.
    Unreachable,
    /// The listen port is closed; the process is presumed dead.
    Dirty,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Unreachable => "unreachable",
            Self::Dirty => "dirty",
        };
        f.write_str(s)
    }
}

/// Request/reply binding. Keyed by topic in a [`ServiceMap`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    /// Consumer group for load-balanced delivery.
    pub group: String,
    /// Downstream HTTP path.
    pub path: String,
    /// Handler timeout in seconds (0 selects the bus default).
    pub timeout: u64,
}

/// Fire-and-forget binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slot {
    /// Topic observed.
    pub topic: String,
    /// Consumer group for load-balanced delivery.
    pub group: String,
    /// Downstream HTTP path.
    pub path: String,
    /// Handler timeout in seconds (0 selects the bus default).
    pub timeout: u64,
}

impl Slot {
    /// Whether `other` has the same (topic, path, group) key.
    #[must_use]
    pub fn same_key(&self, other: &Slot) -> bool {
        self.topic == other.topic
            && normalize_path(&self.path) == normalize_path(&other.path)
            && self.group == other.group
    }

    /// Whether this slot is bound to `topic` at `path`.
    #[must_use]
    pub fn matches_path(&self, topic: &str, path: &str) -> bool {
        self.topic == topic && normalize_path(&self.path) == normalize_path(path)
    }
}

/// Services keyed by topic.
pub type ServiceMap = BTreeMap<String, Service>;

/// Strip the leading slash so "/greet" and "greet" name the same path.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Declared configuration of a node, as supplied at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDescription {
    /// Port the node listens on.
    pub port: String,
    /// Health check path.
    pub health_check: String,
    /// Request/reply bindings.
    pub services: ServiceMap,
    /// Fire-and-forget bindings.
    pub slots: Vec<Slot>,
}

/// Short summary of a registered node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub publish_port: String,
    pub status: HealthStatus,
}
