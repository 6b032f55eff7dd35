//! # Assessment Configuration
//!
//! Typed configuration for every component of the assessment core. Values come
//! from a single TOML file (see [`ConfigManager`]), `ASSESSMENT__SECTION__KEY`
//! environment overrides, and a handful of legacy variables such as
//! `ML_SERVICE_URL` and `REDIS_URL`. Every section has defaults, so a missing
//! file yields a runnable single-process configuration with in-memory
//! backends.
//!
//! ```toml
//! [scoring]
//! base_url = "${ML_SERVICE_URL:-http://localhost:8000}"
//! timeout_ms = 5000
//!
//! [cache]
//! backend = "redis"
//! redis_url = "redis://localhost:6379"
//! ```

pub mod error;
pub mod loader;

use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AssessmentConfig {
    #[validate(nested)]
    pub scoring: ScoringConfig,

    #[validate(nested)]
    pub reasoning: ReasoningConfig,

    #[validate(nested)]
    pub circuit_breaker: CircuitBreakerSettings,

    #[validate(nested)]
    pub cache: CacheConfig,

    #[validate(nested)]
    pub messaging: MessagingConfig,

    #[validate(nested)]
    pub ledger: LedgerConfig,

    #[validate(nested)]
    pub backup: BackupConfig,

    #[validate(nested)]
    pub notifier: NotifierConfig,

    #[validate(nested)]
    pub server: ServerConfig,
}

/// Risk-scoring engine endpoint and result caching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScoringConfig {
    #[validate(length(min = 1))]
    pub base_url: String,

    #[validate(range(min = 1, max = 300000))]
    pub timeout_ms: u64,

    /// How long a scoring result stays cached per (subject, fingerprint)
    #[validate(range(min = 1))]
    pub cache_ttl_seconds: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 5000,
            cache_ttl_seconds: 300,
        }
    }
}

impl ScoringConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

/// Reasoning engine endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ReasoningConfig {
    #[validate(length(min = 1))]
    pub base_url: String,

    #[validate(range(min = 1, max = 600000))]
    pub timeout_ms: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 60000,
        }
    }
}

impl ReasoningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Circuit breaker policy for the scoring engine, in file-friendly units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    #[validate(range(min = 1))]
    pub min_requests: u32,

    #[validate(range(min = 0.0, max = 1.0))]
    pub failure_ratio: f64,

    #[validate(range(min = 1))]
    pub rolling_window_seconds: u64,

    #[validate(range(min = 1))]
    pub open_timeout_seconds: u64,

    #[validate(range(min = 1))]
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            min_requests: 5,
            failure_ratio: 0.6,
            rolling_window_seconds: 60,
            open_timeout_seconds: 30,
            half_open_max_calls: 3,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            min_requests: self.min_requests,
            failure_ratio: self.failure_ratio,
            rolling_window: Duration::from_secs(self.rolling_window_seconds),
            timeout: Duration::from_secs(self.open_timeout_seconds),
            half_open_max_calls: self.half_open_max_calls,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    Redis,
    Moka,
    #[serde(rename = "none")]
    Disabled,
}

/// Shared cache tier plus the local fallback tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,

    pub redis_url: Option<String>,

    /// Capacity of each local (in-process) tier
    #[validate(range(min = 1))]
    pub local_max_capacity: u64,

    #[validate(range(min = 1))]
    pub status_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Moka,
            redis_url: None,
            local_max_capacity: 10_000,
            status_ttl_seconds: 3600,
        }
    }
}

impl CacheConfig {
    pub fn status_ttl(&self) -> Duration {
        Duration::from_secs(self.status_ttl_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagingBackendKind {
    InMemory,
    Pgmq,
}

/// Work queue for asynchronous diagnosis requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MessagingConfig {
    pub backend: MessagingBackendKind,

    pub database_url: Option<String>,

    #[validate(length(min = 1, max = 47))]
    pub diagnosis_queue: String,

    #[validate(range(min = 10))]
    pub poll_interval_ms: u64,

    #[validate(range(min = 1))]
    pub visibility_timeout_seconds: u64,

    /// Messages claimed per poll; one worker handles them one at a time
    #[validate(range(min = 1, max = 100))]
    pub batch_size: u32,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            backend: MessagingBackendKind::InMemory,
            database_url: None,
            diagnosis_queue: "llm_tasks".to_string(),
            poll_interval_ms: 250,
            visibility_timeout_seconds: 120,
            batch_size: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackendKind {
    Memory,
    Postgres,
}

/// Audit ledger persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LedgerConfig {
    pub enabled: bool,

    pub backend: LedgerBackendKind,

    pub database_url: Option<String>,

    /// Actor recorded for entries appended by the coordinator itself
    #[validate(length(min = 1))]
    pub system_actor: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: LedgerBackendKind::Memory,
            database_url: None,
            system_actor: "AI_SYSTEM".to_string(),
        }
    }
}

/// Encrypted ledger backups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory for the file-backed content store; in-memory when unset
    #[validate(length(min = 1))]
    pub directory: Option<String>,
}

/// Realtime push to viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,

    /// Buffered status events before slow listeners start lagging
    #[validate(range(min = 1, max = 65536))]
    pub broadcast_capacity: usize,

    /// Redis pub/sub channel relaying status writes between instances;
    /// only used when the cache backend is Redis
    #[validate(length(min = 1))]
    pub relay_channel: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            broadcast_capacity: 1024,
            relay_channel: "diagnosis_updates".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AssessmentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scoring.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.status_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_breaker_settings_convert_to_durations() {
        let breaker = CircuitBreakerSettings::default().to_breaker_config();
        assert_eq!(breaker.min_requests, 5);
        assert_eq!(breaker.rolling_window, Duration::from_secs(60));
        assert_eq!(breaker.timeout, Duration::from_secs(30));
        assert_eq!(breaker.half_open_max_calls, 3);
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let mut config = AssessmentConfig::default();
        config.circuit_breaker.failure_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_kinds_deserialize_snake_case() {
        let kind: CacheBackendKind = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(kind, CacheBackendKind::Disabled);
        let kind: MessagingBackendKind = serde_json::from_str("\"in_memory\"").unwrap();
        assert_eq!(kind, MessagingBackendKind::InMemory);
    }
}
