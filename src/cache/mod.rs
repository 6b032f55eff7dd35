//! # Cache Module
//!
//! ```text
//! TieredCache                     <- read-through / write-through
//!   ├── CacheProvider (enum)      <- shared tier, circuit-breaker protected
//!   │     ├── Redis(RedisCacheService)
//!   │     ├── Moka(MokaCacheService)
//!   │     └── NoOp(NoOpCacheService)
//!   └── MokaCacheService          <- local tier
//! ```
//!
//! - **Graceful degradation**: Redis failure at startup → NoOp shared tier
//! - **Best-effort writes**: cache errors are logged, never propagated past `TieredCache`
//! - **Per-entry TTL**: every `set` carries its own TTL, in both tiers

pub mod errors;
pub mod provider;
pub mod providers;
pub mod tiered;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use provider::CacheProvider;
pub use providers::{MokaCacheService, NoOpCacheService, RedisCacheService};
pub use tiered::{CacheTier, TieredCache};
pub use traits::CacheService;
