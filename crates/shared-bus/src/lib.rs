//! # Shared Bus - Topic Bus for Node Bindings
//!
//! An in-process publish/subscribe bus with two delivery modes:
//!
//! - **Request/reply** (`reply_to` + `request`): one responder answers each
//!   request; the requester awaits a single [`Reply`] or times out.
//! - **Fire-and-forget** (`slot` + `signal`): every slot subscriber receives the
//!   message; handler results are discarded.
//!
//! ## Topology
//!
//! ```text
//!  requester                                   responder
//! ┌──────────┐  request(topic)  ┌───────────┐  handle()  ┌──────────┐
//! │          │ ───────────────→ │           │ ─────────→ │          │
//! │          │ ←─────────────── │ InMemory  │ ←───────── │          │
//! └──────────┘      Reply       │    Bus    │   Value    └──────────┘
//!                               │           │
//!  signaller   signal(topic)    │           │  handle()  ┌──────────┐
//! ───────────────────────────→  │           │ ─────────→ │  slot(s) │
//!                               └───────────┘            └──────────┘
//! ```
//!
//! ## Ownership
//!
//! Subscribers obtain a [`BusConnection`] per owner. A connection tracks the
//! subscriptions it created; stopping it drops all of them at once, which is
//! how a suspended owner stops receiving traffic.
//!
//! ## Groups
//!
//! Subscriptions may name a consumer group. Within a group, deliveries are
//! load-balanced round-robin; ungrouped slot subscribers each receive every
//! signal.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod connection;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use connection::BusConnection;
pub use events::{BusMessage, DeliveryKind, HandlerOptions};
pub use publisher::InMemoryBus;
pub use shared_types::Reply;
pub use subscriber::{BusError, MessageHandler, SubscriptionId};

/// Maximum deliveries to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Handler timeout applied when a subscription does not specify one.
pub const DEFAULT_HANDLER_TIMEOUT_SECS: u64 = 600;
