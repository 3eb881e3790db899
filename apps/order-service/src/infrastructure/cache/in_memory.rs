//! In-memory markets cache with per-entry TTL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::application::ports::{CacheError, MarketsCachePort};
use crate::domain::Market;

#[derive(Debug, Clone)]
struct Entry {
    markets: Vec<Market>,
    expires_at: Instant,
}

/// Process-local `MarketsCachePort`.
///
/// Expired entries are treated as misses and evicted lazily on read.
#[derive(Debug, Default)]
pub struct InMemoryMarketsCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryMarketsCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl MarketsCachePort for InMemoryMarketsCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<Market>>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.markets.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, markets: &[Market], ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            markets: markets.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketId, UserRole};

    fn market() -> Market {
        Market {
            id: MarketId::generate(),
            name: "ETH-USDT".to_string(),
            enabled: true,
            deleted_at: None,
            allowed_roles: vec![UserRole::Trader],
        }
    }

    #[tokio::test]
    async fn miss_on_empty() {
        let cache = InMemoryMarketsCache::new();
        assert_eq!(cache.get("markets:TRADER").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get() {
        let cache = InMemoryMarketsCache::new();
        let markets = vec![market()];
        cache
            .set("markets:TRADER", &markets, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("markets:TRADER").await.unwrap(), Some(markets));
        assert_eq!(cache.get("markets:ADMIN").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryMarketsCache::new();
        cache
            .set("markets:TRADER", &[market()], Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("markets:TRADER").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("markets:TRADER").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = InMemoryMarketsCache::new();
        cache
            .set("markets:TRADER", &[market()], Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);

        cache.delete("markets:TRADER").await.unwrap();
        assert!(cache.get("markets:TRADER").await.unwrap().is_none());
        assert!(cache.is_empty());
    }
}
