//! Markets Cache Port (Driven Port)
//!
//! Key-value storage for market lists, keyed by role fingerprint.
//! Callers treat every error as a miss.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Market;

/// Cache backend failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Backend refused or failed the operation.
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Port for caching market lists.
#[async_trait]
pub trait MarketsCachePort: Send + Sync {
    /// Read a cached list. `Ok(None)` is a miss.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend fails.
    async fn get(&self, key: &str) -> Result<Option<Vec<Market>>, CacheError>;

    /// Store a list for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend fails.
    async fn set(&self, key: &str, markets: &[Market], ttl: Duration) -> Result<(), CacheError>;

    /// Remove a cached list.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend fails.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
