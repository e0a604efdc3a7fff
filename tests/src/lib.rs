//! # Node Bridge Test Suite
//!
//! End-to-end flows against real downstream nodes.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Fake HTTP nodes, counting transport, harness
//! └── integration/
//!     ├── relay_flow.rs     # Bus message → node → reply
//!     ├── watchdog_flow.rs  # Suspend, resume, evict
//!     └── api_flow.rs       # Control API over a live manager
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bridge-tests
//! cargo test -p bridge-tests integration::watchdog_flow
//! ```

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

pub mod fixtures;
pub mod integration;
