//! Application Services
//!
//! - `order_lifecycle`: create / query / subscribe orchestration
//! - `subscription`: per-subscriber polling task and its handle
//! - `status_simulator`: background lifecycle advancement

mod order_lifecycle;
mod status_simulator;
mod subscription;

pub use order_lifecycle::OrderLifecycleService;
pub use status_simulator::{StatusSimulator, StatusSimulatorConfig};
pub use subscription::{OrderSubscription, SubscriptionConfig, SubscriptionHandle};
