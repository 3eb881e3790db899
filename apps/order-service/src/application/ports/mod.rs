//! Application Ports (Driven Ports)
//!
//! Interfaces for collaborators outside the order lifecycle core.

mod market_validator_port;
mod markets_cache_port;

#[cfg(test)]
pub use market_validator_port::MockMarketValidatorPort;
pub use market_validator_port::{MarketValidatorError, MarketValidatorPort};
pub use markets_cache_port::{CacheError, MarketsCachePort};
