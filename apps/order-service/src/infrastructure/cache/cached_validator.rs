//! Caching decorator over a `MarketValidatorPort`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{MarketValidatorError, MarketValidatorPort, MarketsCachePort};
use crate::domain::{Market, UserRole, roles_fingerprint};
use crate::infrastructure::metrics;

/// Serves market lists from a cache, falling back to the inner validator.
///
/// Cache errors never fail a lookup: a failed read is a miss, a failed
/// write is logged and dropped.
pub struct CachedMarketValidator {
    inner: Arc<dyn MarketValidatorPort>,
    cache: Arc<dyn MarketsCachePort>,
    ttl: Duration,
}

impl CachedMarketValidator {
    /// Wrap `inner`, caching results in `cache` for `ttl`.
    #[must_use]
    pub fn new(
        inner: Arc<dyn MarketValidatorPort>,
        cache: Arc<dyn MarketsCachePort>,
        ttl: Duration,
    ) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait]
impl MarketValidatorPort for CachedMarketValidator {
    async fn view_markets(
        &self,
        roles: &[UserRole],
        request_id: &str,
    ) -> Result<Vec<Market>, MarketValidatorError> {
        let key = roles_fingerprint(roles);

        match self.cache.get(&key).await {
            Ok(Some(markets)) => {
                metrics::record_cache_lookup(true);
                tracing::debug!(key = %key, count = markets.len(), "Markets cache hit");
                return Ok(markets);
            }
            Ok(None) => metrics::record_cache_lookup(false),
            Err(e) => {
                metrics::record_cache_lookup(false);
                tracing::warn!(key = %key, error = %e, "Markets cache read failed");
            }
        }

        let markets = self.inner.view_markets(roles, request_id).await?;

        if let Err(e) = self.cache.set(&key, &markets, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Markets cache write failed");
        }

        Ok(markets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::application::ports::CacheError;
    use crate::domain::MarketId;
    use crate::infrastructure::cache::InMemoryMarketsCache;

    struct CountingValidator {
        calls: AtomicUsize,
        markets: Vec<Market>,
    }

    #[async_trait]
    impl MarketValidatorPort for CountingValidator {
        async fn view_markets(
            &self,
            _roles: &[UserRole],
            _request_id: &str,
        ) -> Result<Vec<Market>, MarketValidatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.markets.clone())
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl MarketsCachePort for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<Market>>, CacheError> {
            Err(CacheError::Backend("connection reset".to_string()))
        }

        async fn set(&self, _key: &str, _markets: &[Market], _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection reset".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection reset".to_string()))
        }
    }

    fn counting() -> Arc<CountingValidator> {
        Arc::new(CountingValidator {
            calls: AtomicUsize::new(0),
            markets: vec![Market {
                id: MarketId::generate(),
                name: "SOL-USDT".to_string(),
                enabled: true,
                deleted_at: None,
                allowed_roles: vec![UserRole::Trader, UserRole::Admin],
            }],
        })
    }

    #[tokio::test]
    async fn second_lookup_for_same_roles_is_cached() {
        let inner = counting();
        let validator = CachedMarketValidator::new(
            Arc::clone(&inner) as Arc<dyn MarketValidatorPort>,
            Arc::new(InMemoryMarketsCache::new()),
            Duration::from_secs(60),
        );

        let first = validator
            .view_markets(&[UserRole::Trader, UserRole::Admin], "req-1")
            .await
            .unwrap();
        let second = validator
            .view_markets(&[UserRole::Admin, UserRole::Trader], "req-1")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_roles_miss() {
        let inner = counting();
        let validator = CachedMarketValidator::new(
            Arc::clone(&inner) as Arc<dyn MarketValidatorPort>,
            Arc::new(InMemoryMarketsCache::new()),
            Duration::from_secs(60),
        );

        validator.view_markets(&[UserRole::Trader], "req-1").await.unwrap();
        validator.view_markets(&[UserRole::Viewer], "req-1").await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broken_cache_falls_through_to_validator() {
        let inner = counting();
        let validator = CachedMarketValidator::new(
            Arc::clone(&inner) as Arc<dyn MarketValidatorPort>,
            Arc::new(BrokenCache),
            Duration::from_secs(60),
        );

        let markets = validator.view_markets(&[UserRole::Trader], "req-1").await.unwrap();
        validator.view_markets(&[UserRole::Trader], "req-1").await.unwrap();

        assert_eq!(markets.len(), 1);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
