//! # PGMQ Messaging Service
//!
//! PostgreSQL message queue via the `pgmq` crate. Payloads are stored as
//! JSON documents; acked messages are archived rather than deleted so they
//! remain inspectable.

use std::time::Duration;

use async_trait::async_trait;
use pgmq::PGMQueue;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::messaging::service::traits::MessagingService;
use crate::messaging::service::types::{MessageId, QueuedMessage, ReceiptHandle};
use crate::messaging::MessagingError;

/// PGMQ-backed messaging provider
#[derive(Clone)]
pub struct PgmqMessagingService {
    queue: PGMQueue,
}

impl std::fmt::Debug for PgmqMessagingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgmqMessagingService").finish_non_exhaustive()
    }
}

impl PgmqMessagingService {
    /// Connect using a database URL
    pub async fn new(database_url: &str) -> Result<Self, MessagingError> {
        info!("🚀 Connecting to pgmq");
        let queue = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| MessagingError::connection(e.to_string()))?;
        info!("✅ Connected to pgmq");
        Ok(Self { queue })
    }

    /// Reuse an existing connection pool
    pub async fn new_with_pool(pool: PgPool) -> Self {
        Self {
            queue: PGMQueue::new_with_pool(pool).await,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.queue.connection
    }
}

#[async_trait]
impl MessagingService for PgmqMessagingService {
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        debug!(queue = %queue_name, "📋 Ensuring queue exists");
        self.queue
            .create(queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "create", e.to_string()))
    }

    async fn send_raw(
        &self,
        queue_name: &str,
        payload: Vec<u8>,
    ) -> Result<MessageId, MessagingError> {
        let document: serde_json::Value = serde_json::from_slice(&payload)
            .map_err(|e| MessagingError::message_serialization(e.to_string()))?;

        let id = self
            .queue
            .send(queue_name, &document)
            .await
            .map_err(|e| MessagingError::send(queue_name, e.to_string()))?;

        debug!(queue = %queue_name, msg_id = id, "📤 Message sent");
        Ok(MessageId::from(id))
    }

    async fn receive_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage>, MessagingError> {
        let vt = i32::try_from(visibility_timeout.as_secs()).unwrap_or(i32::MAX);
        let limit = i32::try_from(max_messages).unwrap_or(i32::MAX);

        let messages = self
            .queue
            .read_batch::<serde_json::Value>(queue_name, Some(vt), limit)
            .await
            .map_err(|e| MessagingError::receive(queue_name, e.to_string()))?
            .unwrap_or_default();

        messages
            .into_iter()
            .map(|message| {
                Ok(QueuedMessage {
                    receipt_handle: ReceiptHandle::from(message.msg_id),
                    payload: serde_json::to_vec(&message.message)?,
                    receive_count: u32::try_from(message.read_ct).unwrap_or(0),
                    enqueued_at: message.enqueued_at,
                })
            })
            .collect()
    }

    async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        let id = receipt_handle
            .as_i64()
            .ok_or_else(|| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))?;

        self.queue
            .archive(queue_name, id)
            .await
            .map(|_| ())
            .map_err(|e| MessagingError::ack(queue_name, id, e.to_string()))
    }

    async fn health_check(&self) -> Result<bool, MessagingError> {
        sqlx::query("SELECT 1")
            .execute(&self.queue.connection)
            .await
            .map(|_| true)
            .map_err(|e| MessagingError::connection(e.to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "pgmq"
    }
}
