//! # Messaging Types

use chrono::{DateTime, Utc};

use super::traits::QueueMessage;
use crate::messaging::MessagingError;

/// Provider-assigned identifier for a queued message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Handle for acknowledging a received message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub String);

impl ReceiptHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as a numeric message id (pgmq and in-memory handles)
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl From<i64> for ReceiptHandle {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for ReceiptHandle {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A message claimed from a queue, still undecoded
///
/// Decoding is left to the consumer so a single malformed payload can be
/// dropped without failing the whole receive.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub receipt_handle: ReceiptHandle,
    pub payload: Vec<u8>,
    /// How many times this message has been handed out, this time included
    pub receive_count: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedMessage {
    pub fn decode<T: QueueMessage>(&self) -> Result<T, MessagingError> {
        T::from_bytes(&self.payload)
    }
}
