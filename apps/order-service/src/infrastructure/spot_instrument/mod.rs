//! Spot Instrument Client (Driven Adapter)
//!
//! gRPC client for the spot instrument service, which owns the market
//! catalogue. Implements `MarketValidatorPort` so order creation can check
//! that a market is visible to the caller's roles.
//!
//! Transient failures (`UNAVAILABLE`, `DEADLINE_EXCEEDED`, ...) are retried
//! here with exponential backoff; the lifecycle service never retries.

mod client;
mod config;
mod error;
mod retry;

pub use client::SpotInstrumentClient;
pub use config::SpotInstrumentConfig;
pub use error::SpotInstrumentError;
pub use retry::{RetryConfig, RetryPolicy, is_retryable};
