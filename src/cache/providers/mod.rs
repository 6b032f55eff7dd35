//! Cache provider implementations

pub mod moka;
pub mod noop;
pub mod redis;

pub use self::moka::MokaCacheService;
pub use self::noop::NoOpCacheService;
pub use self::redis::RedisCacheService;
