//! Cross-crate flows.

pub mod api_flow;
pub mod relay_flow;
pub mod watchdog_flow;
