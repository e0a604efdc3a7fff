//! Ports (hexagonal boundaries) of the node bridge.

pub mod inbound;
pub mod outbound;


pub use inbound::NodeControl;
pub use outbound::*;
