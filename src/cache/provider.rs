//! Cache provider with integrated circuit breaker
//!
//! Enum dispatch over the concrete backends. Distributed backends get a
//! circuit breaker so an unreachable Redis costs one fast miss instead of a
//! timeout per request:
//!
//! - When open: `get()` returns `Ok(None)`, `set()`/`delete()` return `Ok(())`
//! - Recovers on its own once trial calls succeed

use super::errors::CacheResult;
use super::providers::{MokaCacheService, NoOpCacheService, RedisCacheService};
use super::traits::CacheService;
use crate::config::{CacheBackendKind, CacheConfig};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
enum CacheBackend {
    /// Redis cache provider (boxed to reduce enum size)
    Redis(Box<RedisCacheService>),

    /// Moka in-memory cache provider
    Moka(Box<MokaCacheService>),

    /// No-op cache provider (always miss, always succeed)
    NoOp(NoOpCacheService),
}

impl CacheBackend {
    fn is_distributed(&self) -> bool {
        match self {
            Self::Redis(s) => s.is_distributed(),
            Self::Moka(s) => s.is_distributed(),
            Self::NoOp(s) => s.is_distributed(),
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Self::Redis(s) => s.provider_name(),
            Self::Moka(s) => s.provider_name(),
            Self::NoOp(s) => s.provider_name(),
        }
    }

    fn is_enabled(&self) -> bool {
        !matches!(self, Self::NoOp(_))
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            Self::Redis(s) => s.get(key).await,
            Self::Moka(s) => s.get(key).await,
            Self::NoOp(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match self {
            Self::Redis(s) => s.set(key, value, ttl).await,
            Self::Moka(s) => s.set(key, value, ttl).await,
            Self::NoOp(s) => s.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        match self {
            Self::Redis(s) => s.delete(key).await,
            Self::Moka(s) => s.delete(key).await,
            Self::NoOp(s) => s.delete(key).await,
        }
    }

    async fn health_check(&self) -> CacheResult<bool> {
        match self {
            Self::Redis(s) => s.health_check().await,
            Self::Moka(s) => s.health_check().await,
            Self::NoOp(s) => s.health_check().await,
        }
    }
}

/// Cache provider with integrated circuit breaker protection
#[derive(Clone)]
pub struct CacheProvider {
    backend: CacheBackend,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
}

impl std::fmt::Debug for CacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheProvider")
            .field("backend", &self.backend)
            .field(
                "circuit_breaker",
                &self.circuit_breaker.as_ref().map(|cb| cb.state()),
            )
            .finish()
    }
}

impl CacheProvider {
    /// Create a cache provider from configuration with graceful degradation
    ///
    /// If Redis is configured but fails to connect, logs a warning and
    /// returns a NoOp provider instead. The system never fails to start
    /// due to cache issues.
    pub async fn from_config_graceful(config: &CacheConfig) -> Self {
        let backend = match config.backend {
            CacheBackendKind::Disabled => {
                info!("Shared cache disabled by configuration");
                CacheBackend::NoOp(NoOpCacheService::new())
            }
            CacheBackendKind::Moka => {
                info!(
                    backend = "moka",
                    max_capacity = config.local_max_capacity,
                    "In-memory cache provider initialized"
                );
                CacheBackend::Moka(Box::new(MokaCacheService::new(config.local_max_capacity)))
            }
            CacheBackendKind::Redis => Self::create_redis_backend(config).await,
        };

        let circuit_breaker = if backend.is_distributed() && backend.is_enabled() {
            Some(Arc::new(CircuitBreaker::new(
                "cache",
                Self::cache_breaker_config(),
            )))
        } else {
            None
        };

        Self {
            backend,
            circuit_breaker,
        }
    }

    async fn create_redis_backend(config: &CacheConfig) -> CacheBackend {
        let Some(url) = config.redis_url.as_deref() else {
            warn!("Redis cache selected but no redis_url configured, falling back to NoOp");
            return CacheBackend::NoOp(NoOpCacheService::new());
        };

        match RedisCacheService::connect(url).await {
            Ok(service) => {
                info!(backend = "redis", "Distributed cache provider initialized");
                CacheBackend::Redis(Box::new(service))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to connect to Redis, falling back to NoOp cache"
                );
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        }
    }

    fn cache_breaker_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            min_requests: 5,
            failure_ratio: 0.5,
            rolling_window: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            half_open_max_calls: 1,
        }
    }

    /// Create a NoOp provider (for explicit opt-out or testing)
    pub fn noop() -> Self {
        Self {
            backend: CacheBackend::NoOp(NoOpCacheService::new()),
            circuit_breaker: None,
        }
    }

    /// Create an in-process provider
    pub fn moka(max_capacity: u64) -> Self {
        Self {
            backend: CacheBackend::Moka(Box::new(MokaCacheService::new(max_capacity))),
            circuit_breaker: None,
        }
    }

    /// Wrap an existing Redis connection
    pub fn redis(service: RedisCacheService) -> Self {
        Self {
            backend: CacheBackend::Redis(Box::new(service)),
            circuit_breaker: Some(Arc::new(CircuitBreaker::new(
                "cache",
                Self::cache_breaker_config(),
            ))),
        }
    }

    /// Attach a circuit breaker regardless of backend
    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Check if caching is actually enabled (not NoOp)
    pub fn is_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    /// Check if this provider is safe for multi-instance deployments
    pub fn is_distributed(&self) -> bool {
        self.backend.is_distributed()
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    /// Get current circuit breaker state (for monitoring)
    pub fn circuit_state(&self) -> Option<CircuitState> {
        self.circuit_breaker.as_ref().map(|cb| cb.state())
    }

    /// Get a value from cache
    ///
    /// If circuit is open, returns `Ok(None)` (cache miss behavior).
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let Some(cb) = &self.circuit_breaker else {
            return self.backend.get(key).await;
        };

        match cb.call(|| self.backend.get(key)).await {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
            Err(_) => {
                debug!(key = key, "Cache circuit open, returning miss");
                Ok(None)
            }
        }
    }

    /// Set a value in cache with TTL
    ///
    /// If circuit is open, returns `Ok(())` (no-op behavior).
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let Some(cb) = &self.circuit_breaker else {
            return self.backend.set(key, value, ttl).await;
        };

        match cb.call(|| self.backend.set(key, value, ttl)).await {
            Ok(()) => Ok(()),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
            Err(_) => {
                debug!(key = key, "Cache circuit open, skipping set");
                Ok(())
            }
        }
    }

    /// Delete a key from cache
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        let Some(cb) = &self.circuit_breaker else {
            return self.backend.delete(key).await;
        };

        match cb.call(|| self.backend.delete(key)).await {
            Ok(()) => Ok(()),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
            Err(_) => Ok(()),
        }
    }

    /// Health check (bypasses circuit breaker)
    pub async fn health_check(&self) -> CacheResult<bool> {
        self.backend.health_check().await
    }
}
