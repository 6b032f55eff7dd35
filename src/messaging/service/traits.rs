//! # Messaging Service Traits
//!
//! Provider-agnostic queue operations. Implementations exist for an
//! in-process queue and for PostgreSQL via pgmq.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{MessageId, QueuedMessage, ReceiptHandle};
use crate::messaging::MessagingError;

/// Core messaging service trait
#[async_trait]
pub trait MessagingService: Send + Sync + 'static {
    /// Create a queue if it doesn't exist (idempotent)
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError>;

    /// Serialize and send a message
    async fn send_message<T: QueueMessage>(
        &self,
        queue_name: &str,
        message: &T,
    ) -> Result<MessageId, MessagingError> {
        let bytes = message.to_bytes()?;
        self.send_raw(queue_name, bytes).await
    }

    /// Send an already-serialized payload
    async fn send_raw(&self, queue_name: &str, payload: Vec<u8>)
        -> Result<MessageId, MessagingError>;

    /// Claim up to `max_messages`, hiding them for `visibility_timeout`
    async fn receive_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage>, MessagingError>;

    /// Remove a processed message
    async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError>;

    async fn health_check(&self) -> Result<bool, MessagingError>;

    fn provider_name(&self) -> &'static str;
}

/// Messages that can travel through a queue
pub trait QueueMessage: Send + Sync + Clone + 'static {
    fn to_bytes(&self) -> Result<Vec<u8>, MessagingError>;

    fn from_bytes(bytes: &[u8]) -> Result<Self, MessagingError>
    where
        Self: Sized;
}

/// JSON encoding for every serde type
impl<T> QueueMessage for T
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + Clone + 'static,
{
    fn to_bytes(&self) -> Result<Vec<u8>, MessagingError> {
        serde_json::to_vec(self).map_err(|e| MessagingError::message_serialization(e.to_string()))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, MessagingError> {
        serde_json::from_slice(bytes)
            .map_err(|e| MessagingError::message_deserialization(e.to_string()))
    }
}
