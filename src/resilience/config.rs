//! # Circuit Breaker Configuration
//!
//! Policy for a single ratio-based circuit breaker. The file-facing
//! equivalent lives in `crate::config::CircuitBreakerSettings`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Requests the rolling window must hold before the failure ratio is considered
    pub min_requests: u32,

    /// Failure ratio (0.0 to 1.0) at or above which the circuit opens
    pub failure_ratio: f64,

    /// Length of the closed-state counting window; counts reset when it elapses
    pub rolling_window: Duration,

    /// Time to wait in open state before attempting recovery
    pub timeout: Duration,

    /// Trial calls admitted while half-open; this many successes close the circuit
    pub half_open_max_calls: u32,
}

impl CircuitBreakerConfig {
    /// Policy for the external risk-scoring engine
    pub fn for_scoring_engine() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.min_requests == 0 {
            return Err("min_requests must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.failure_ratio) || self.failure_ratio == 0.0 {
            return Err("failure_ratio must be within (0.0, 1.0]".to_string());
        }

        if self.rolling_window.is_zero() {
            return Err("rolling_window must be greater than 0".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.timeout > Duration::from_secs(300) {
            return Err("timeout should not exceed 300 seconds".to_string());
        }

        if self.half_open_max_calls == 0 {
            return Err("half_open_max_calls must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            min_requests: 5,
            failure_ratio: 0.6,
            rolling_window: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
            half_open_max_calls: 3,
        }
    }
}
