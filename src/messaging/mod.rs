//! # Messaging
//!
//! Work queue used to hand diagnosis requests to background workers.

pub mod errors;
pub mod service;

pub use errors::MessagingError;
pub use service::{
    InMemoryMessagingService, MessageId, MessagingProvider, MessagingService,
    PgmqMessagingService, QueueMessage, QueuedMessage, ReceiptHandle,
};
