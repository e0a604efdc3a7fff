//! # Node Bridge Core
//!
//! Bridges a publish/subscribe bus to a fleet of HTTP microservices
//! ("nodes"). A node declares the topics it answers (services) and observes
//! (slots); the bridge subscribes on its behalf, forwards every matching
//! message to the node over HTTP and, for services, publishes the node's
//! answer as the reply.
//!
//! ## Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Registry | `service/registry.rs` | id → node map behind one lock |
//! | Node lifecycle | `service/node.rs` | start, stop, delete |
//! | Subscription manager | `service/subscriptions.rs` | add/remove services and slots |
//! | Message bridge | `service/bridge.rs` | bus message → HTTP POST → reply |
//! | Watchdog | `service/watchdog.rs` | per-node health loop |
//! | Relay | `service/relay.rs` | one-shot request on a node's behalf |
//! | Manager | `service/manager.rs` | creation, deletion, [`NodeControl`] |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - in-memory bus transport, reqwest probe/forwarder   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - NodeControl                                │
//! │  ports/outbound.rs - Transport, NodeProber, Forwarder           │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service/ - registry, lifecycle, bridge, watchdog, relay        │
//! │  domain/  - NodeId, HealthStatus, Service, Slot, decide()       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! - One watchdog task per node, cancelled through the node's shutdown
//!   signal on every delete path.
//! - Bridge invocations run concurrently; they never touch node state.
//! - The registry lock and the per-node lock are never held across an `.await`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{BusTransportFactory, HttpNodeClient};
pub use config::ManagerConfig;
pub use domain::{HealthStatus, NodeDescription, NodeId, NodeSnapshot, Service, ServiceMap, Slot};
pub use error::{ForwardError, ProbeError, ProxyError, TransportError};
pub use ports::NodeControl;
pub use service::{Node, NodeManager, NodeRegistry};
