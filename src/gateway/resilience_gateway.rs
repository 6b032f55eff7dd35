//! # Resilience Gateway
//!
//! Cache lookup, then the scoring engine behind a circuit breaker, then the
//! heuristic. Callers always get a usable score.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::heuristic;
use crate::cache::CacheProvider;
use crate::clients::RiskScoringEngine;
use crate::logging::log_cache_operation;
use crate::models::{RiskAssessment, RiskScoreResult, RiskSource, VitalsFingerprint, VitalsSnapshot};
use crate::resilience::{CircuitBreaker, CircuitBreakerError, CircuitState};

/// Cache key for a score computed for `subject_id` from these vitals
pub fn risk_cache_key(subject_id: &str, fingerprint: &VitalsFingerprint) -> String {
    format!("risk:{subject_id}:{fingerprint}")
}

pub struct ResilienceGateway {
    engine: Arc<dyn RiskScoringEngine>,
    cache: CacheProvider,
    breaker: Arc<CircuitBreaker>,
    cache_ttl: Duration,
}

impl std::fmt::Debug for ResilienceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceGateway")
            .field("engine", &self.engine.name())
            .field("cache", &self.cache)
            .field("breaker_state", &self.breaker.state())
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl ResilienceGateway {
    pub fn new(
        engine: Arc<dyn RiskScoringEngine>,
        cache: CacheProvider,
        breaker: Arc<CircuitBreaker>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            engine,
            cache,
            breaker,
            cache_ttl,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Risk scores for one request; never fails
    pub async fn get_risk_scores(&self, subject_id: &str, vitals: &VitalsSnapshot) -> RiskAssessment {
        let key = risk_cache_key(subject_id, &vitals.fingerprint());

        if let Some(result) = self.lookup(&key).await {
            return RiskAssessment {
                result,
                confidence_downgraded: false,
                source: RiskSource::Cache,
            };
        }

        match self.breaker.call(|| self.engine.predict(vitals)).await {
            Ok(result) => {
                self.store(&key, &result).await;
                RiskAssessment {
                    result,
                    confidence_downgraded: false,
                    source: RiskSource::Engine,
                }
            }
            Err(err) => {
                match &err {
                    CircuitBreakerError::OperationFailed(e) => warn!(
                        subject_id = %subject_id,
                        error = %e,
                        "Scoring engine failed, using heuristic estimate"
                    ),
                    rejection => info!(
                        subject_id = %subject_id,
                        reason = %rejection,
                        "Scoring engine short-circuited, using heuristic estimate"
                    ),
                }
                RiskAssessment {
                    result: heuristic::estimate(vitals),
                    confidence_downgraded: true,
                    source: RiskSource::Heuristic,
                }
            }
        }
    }

    async fn lookup(&self, key: &str) -> Option<RiskScoreResult> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(result) => {
                    log_cache_operation("get", key, self.cache.provider_name(), "hit");
                    Some(result)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding unreadable cached risk score");
                    None
                }
            },
            Ok(None) => {
                log_cache_operation("get", key, self.cache.provider_name(), "miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Risk cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &str, result: &RiskScoreResult) {
        let raw = match serde_json::to_string(result) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Could not serialize risk score for caching");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &raw, self.cache_ttl).await {
            warn!(key = %key, error = %e, "Risk cache store failed");
        } else {
            debug!(key = %key, ttl_seconds = self.cache_ttl.as_secs(), "Cached risk score");
        }
    }
}
