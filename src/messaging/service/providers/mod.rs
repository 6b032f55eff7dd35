//! Messaging provider implementations

pub mod in_memory;
pub mod pgmq;

pub use in_memory::InMemoryMessagingService;
pub use self::pgmq::PgmqMessagingService;
