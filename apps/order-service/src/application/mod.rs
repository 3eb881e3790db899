//! Application Layer - Use cases and port definitions.
//!
//! - `ports`: outbound interfaces (market validator, markets cache)
//! - `dto`: request/response shapes for the lifecycle operations
//! - `errors`: the error taxonomy every operation reports
//! - `services`: order lifecycle orchestration, subscriptions, simulator

pub mod dto;
pub mod errors;
pub mod ports;
pub mod services;

pub use errors::OrderServiceError;
