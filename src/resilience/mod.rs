//! # Resilience
//!
//! Fault isolation for calls to unreliable collaborators.

pub mod circuit_breaker;
pub mod config;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState, StateTransition};
pub use config::CircuitBreakerConfig;
pub use metrics::CircuitBreakerMetrics;
