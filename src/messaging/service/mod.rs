//! # Messaging Service
//!
//! Provider-agnostic queue abstraction.

pub mod provider;
pub mod providers;
pub mod traits;
pub mod types;

pub use provider::MessagingProvider;
pub use providers::{InMemoryMessagingService, PgmqMessagingService};
pub use traits::{MessagingService, QueueMessage};
pub use types::{MessageId, QueuedMessage, ReceiptHandle};
