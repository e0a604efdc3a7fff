//! Adapters implementing the outbound ports.

pub mod bus;
pub mod http;

pub use bus::{BusTransport, BusTransportFactory};
pub use http::HttpNodeClient;
