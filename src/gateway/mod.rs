//! Risk scoring with caching, circuit breaking and a heuristic fallback.

pub mod heuristic;
pub mod medications;
pub mod resilience_gateway;

pub use medications::{check_medications, InteractionResult};
pub use resilience_gateway::{risk_cache_key, ResilienceGateway};
