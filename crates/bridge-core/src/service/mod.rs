//! Service layer: registry, node lifecycle, subscriptions, bridge, watchdog,
//! relay and the manager that ties them together.

pub mod bridge;
pub mod manager;
pub mod node;
pub mod registry;
pub mod relay;
pub mod subscriptions;
pub mod watchdog;

pub use bridge::MessageBridge;
pub use manager::NodeManager;
pub use node::{delete_node, Node};
pub use registry::NodeRegistry;
pub use relay::RequestRelay;
pub use watchdog::{Tick, Watchdog};
