//! # In-Memory Messaging Service
//!
//! Process-local queues for tests and single-process deployments. Messages
//! become invisible when received and reappear once the visibility timeout
//! lapses without an ack.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::messaging::service::traits::MessagingService;
use crate::messaging::service::types::{MessageId, QueuedMessage, ReceiptHandle};
use crate::messaging::MessagingError;

#[derive(Debug, Clone)]
struct StoredMessage {
    id: u64,
    payload: Vec<u8>,
    enqueued_at: DateTime<Utc>,
    visible_at: Option<DateTime<Utc>>,
    receive_count: u32,
}

impl StoredMessage {
    fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.visible_at.map_or(true, |at| at <= now)
    }
}

#[derive(Debug, Default)]
struct InMemoryQueue {
    messages: VecDeque<StoredMessage>,
    next_id: AtomicU64,
}

/// In-memory messaging provider
#[derive(Debug)]
pub struct InMemoryMessagingService {
    queues: RwLock<HashMap<String, InMemoryQueue>>,
    reachable: AtomicBool,
}

impl Default for InMemoryMessagingService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessagingService {
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulate the broker going away; every operation fails until restored
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    /// Messages currently stored in the queue, visible or not
    pub async fn queue_length(&self, queue_name: &str) -> usize {
        self.queues
            .read()
            .await
            .get(queue_name)
            .map_or(0, |q| q.messages.len())
    }

    fn check_reachable(&self) -> Result<(), MessagingError> {
        if self.is_reachable() {
            Ok(())
        } else {
            Err(MessagingError::connection("in-memory broker marked unreachable"))
        }
    }
}

#[async_trait]
impl MessagingService for InMemoryMessagingService {
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        self.check_reachable()?;
        self.queues
            .write()
            .await
            .entry(queue_name.to_string())
            .or_default();
        Ok(())
    }

    async fn send_raw(
        &self,
        queue_name: &str,
        payload: Vec<u8>,
    ) -> Result<MessageId, MessagingError> {
        self.check_reachable()?;
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let id = queue.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        queue.messages.push_back(StoredMessage {
            id,
            payload,
            enqueued_at: Utc::now(),
            visible_at: None,
            receive_count: 0,
        });

        Ok(MessageId::from(id))
    }

    async fn receive_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage>, MessagingError> {
        self.check_reachable()?;
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let now = Utc::now();
        let hidden_until = now
            + chrono::Duration::from_std(visibility_timeout)
                .map_err(|e| MessagingError::receive(queue_name, e.to_string()))?;

        let mut claimed = Vec::new();
        for stored in queue.messages.iter_mut() {
            if claimed.len() >= max_messages {
                break;
            }
            if !stored.is_visible(now) {
                continue;
            }
            stored.visible_at = Some(hidden_until);
            stored.receive_count += 1;
            claimed.push(QueuedMessage {
                receipt_handle: ReceiptHandle::from(stored.id),
                payload: stored.payload.clone(),
                receive_count: stored.receive_count,
                enqueued_at: stored.enqueued_at,
            });
        }

        Ok(claimed)
    }

    async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        self.check_reachable()?;
        let id = receipt_handle
            .as_i64()
            .ok_or_else(|| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))?;

        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let position = queue
            .messages
            .iter()
            .position(|m| m.id as i64 == id)
            .ok_or_else(|| MessagingError::message_not_found(receipt_handle.as_str()))?;
        queue.messages.remove(position);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, MessagingError> {
        Ok(self.is_reachable())
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}
