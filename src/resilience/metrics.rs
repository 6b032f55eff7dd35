//! # Circuit Breaker Metrics
//!
//! Point-in-time snapshots of a circuit breaker, suitable for health
//! endpoints and periodic log lines.

use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Calls that reached the protected operation
    pub total_calls: u64,

    /// Number of successful calls
    pub success_count: u64,

    /// Number of failed calls
    pub failure_count: u64,

    /// Calls short-circuited without reaching the operation
    pub rejected_count: u64,

    /// Requests counted in the current window
    pub window_requests: u32,

    /// Failures counted in the current window
    pub window_failures: u32,

    /// Current consecutive failure count
    pub consecutive_failures: u32,

    /// Total duration of all operations
    pub total_duration: Duration,

    /// Current circuit breaker state
    pub current_state: CircuitState,

    /// Lifetime failure rate (0.0 to 1.0)
    pub failure_rate: f64,

    /// Lifetime success rate (0.0 to 1.0)
    pub success_rate: f64,

    /// Average operation duration
    pub average_duration: Duration,
}

impl CircuitBreakerMetrics {
    /// Failure ratio inside the current window
    pub fn window_failure_ratio(&self) -> f64 {
        if self.window_requests == 0 {
            return 0.0;
        }
        self.window_failures as f64 / self.window_requests as f64
    }

    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => self.failure_rate < 0.1,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing system health",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Success: {:.1}% | Failures: {} | Rejected: {} | Window: {}/{} | Avg Duration: {}ms",
            self.state_description(),
            self.total_calls,
            self.success_rate * 100.0,
            self.failure_count,
            self.rejected_count,
            self.window_failures,
            self.window_requests,
            self.average_duration.as_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(state: CircuitState) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            total_calls: 10,
            success_count: 4,
            failure_count: 6,
            rejected_count: 3,
            window_requests: 5,
            window_failures: 3,
            consecutive_failures: 2,
            total_duration: Duration::from_millis(100),
            current_state: state,
            failure_rate: 0.6,
            success_rate: 0.4,
            average_duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_window_ratio() {
        assert!((sample(CircuitState::Closed).window_failure_ratio() - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_mentions_state_and_counts() {
        let summary = sample(CircuitState::Open).format_summary();
        assert!(summary.contains("Failing"));
        assert!(summary.contains("Rejected: 3"));
        assert!(summary.contains("Window: 3/5"));
        assert!(!sample(CircuitState::Open).is_healthy());
    }
}
