//! Two-tier read-through / write-through cache
//!
//! The shared tier (Redis in multi-instance deployments) is the source of
//! truth across processes; the local Moka tier keeps the last value this
//! process wrote or read, so reads keep working when the shared tier is
//! unreachable. Every entry in both tiers lives for the cache's TTL.
//!
//! Consistency is eventual and bounded by TTL: a local entry may be stale
//! while another instance writes the shared tier, until either a successful
//! shared read refreshes it or it expires.
//!
//! Errors never escape this type. A failing shared tier is logged and
//! treated as a miss on read and skipped on write.

use super::provider::CacheProvider;
use super::providers::MokaCacheService;
use super::traits::CacheService;
use std::time::Duration;
use tracing::{debug, warn};

/// Which tier served a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Shared,
    Local,
}

#[derive(Debug, Clone)]
pub struct TieredCache {
    shared: CacheProvider,
    local: MokaCacheService,
    ttl: Duration,
}

impl TieredCache {
    pub fn new(shared: CacheProvider, local_max_capacity: u64, ttl: Duration) -> Self {
        Self {
            shared,
            local: MokaCacheService::new(local_max_capacity),
            ttl,
        }
    }

    /// Write to the local tier, then the shared tier
    pub async fn set(&self, key: &str, value: &str) {
        // Local tier is in-process and infallible
        let _ = self.local.set(key, value, self.ttl).await;

        if let Err(e) = self.shared.set(key, value, self.ttl).await {
            warn!(
                key = key,
                provider = self.shared.provider_name(),
                error = %e,
                "Shared cache write failed, value kept in local tier only"
            );
        }
    }

    /// Read the shared tier first, then fall back to the local tier
    pub async fn get(&self, key: &str) -> Option<String> {
        self.get_with_tier(key).await.map(|(value, _)| value)
    }

    /// Like [`get`](Self::get) but reports which tier answered
    pub async fn get_with_tier(&self, key: &str) -> Option<(String, CacheTier)> {
        match self.shared.get(key).await {
            Ok(Some(value)) => {
                let _ = self.local.set(key, &value, self.ttl).await;
                return Some((value, CacheTier::Shared));
            }
            Ok(None) => {
                debug!(key = key, "Shared cache miss, trying local tier");
            }
            Err(e) => {
                warn!(
                    key = key,
                    provider = self.shared.provider_name(),
                    error = %e,
                    "Shared cache read failed, trying local tier"
                );
            }
        }

        match self.local.get(key).await {
            Ok(Some(value)) => Some((value, CacheTier::Local)),
            _ => None,
        }
    }

    /// Remove from both tiers
    pub async fn delete(&self, key: &str) {
        let _ = self.local.delete(key).await;
        if let Err(e) = self.shared.delete(key).await {
            warn!(key = key, error = %e, "Shared cache delete failed");
        }
    }

    pub fn shared(&self) -> &CacheProvider {
        &self.shared
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_write_through_reads_from_shared() {
        let cache = TieredCache::new(CacheProvider::moka(100), 100, TTL);
        cache.set("k", "v").await;

        assert_eq!(
            cache.get_with_tier("k").await,
            Some(("v".to_string(), CacheTier::Shared))
        );
    }

    #[tokio::test]
    async fn test_shared_miss_falls_back_to_local() {
        let cache = TieredCache::new(CacheProvider::noop(), 100, TTL);
        cache.set("k", "v").await;

        assert_eq!(
            cache.get_with_tier("k").await,
            Some(("v".to_string(), CacheTier::Local))
        );
    }

    #[tokio::test]
    async fn test_unavailable_shared_tier_is_a_miss() {
        let breaker = Arc::new(CircuitBreaker::new("cache", CircuitBreakerConfig::default()));
        let shared = CacheProvider::moka(100).with_circuit_breaker(Arc::clone(&breaker));
        let cache = TieredCache::new(shared, 100, TTL);

        cache.set("k", "v").await;
        breaker.force_open();

        assert_eq!(
            cache.get_with_tier("k").await,
            Some(("v".to_string(), CacheTier::Local))
        );
    }

    #[tokio::test]
    async fn test_shared_hit_refreshes_local_tier() {
        let shared = CacheProvider::moka(100);
        shared.set("k", "from-peer", TTL).await.unwrap();

        let breaker = Arc::new(CircuitBreaker::new("cache", CircuitBreakerConfig::default()));
        let cache = TieredCache::new(shared.with_circuit_breaker(Arc::clone(&breaker)), 100, TTL);

        assert_eq!(cache.get("k").await, Some("from-peer".to_string()));
        breaker.force_open();
        assert_eq!(
            cache.get_with_tier("k").await,
            Some(("from-peer".to_string(), CacheTier::Local))
        );
    }

    #[tokio::test]
    async fn test_total_miss_and_delete() {
        let cache = TieredCache::new(CacheProvider::moka(100), 100, TTL);
        assert_eq!(cache.get("missing").await, None);

        cache.set("k", "v").await;
        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }
}
