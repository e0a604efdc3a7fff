//! # Shared Types Crate
//!
//! This crate contains the payloads that cross process or layer boundaries:
//! the bus envelope delivered to downstream nodes, the reply envelope that
//! travels back over the bus, and the request/response bodies of the relay.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every JSON shape the bus or the control API
//!   emits is defined here, so field names cannot drift between crates.
//! - **Opaque Data**: message data is carried as `serde_json::Value`; the
//!   control plane never interprets what a node sends or returns.

pub mod envelope;
pub mod ipc;

pub use envelope::{Envelope, Reply, REPLY_OK};
pub use ipc::{Request, RequestResponse, StatusResponse, STATUS_OK};
