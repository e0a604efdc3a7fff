//! Domain layer: pure types and the watchdog transition function.

pub mod entities;
pub mod health;

pub use entities::*;
pub use health::{decide, ProbeOutcome, WatchdogAction};
