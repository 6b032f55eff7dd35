//! # Messaging Provider Enum
//!
//! Enum dispatch over the concrete providers so `SystemContext` stays
//! non-generic.

use std::sync::Arc;
use std::time::Duration;

use super::providers::{InMemoryMessagingService, PgmqMessagingService};
use super::traits::{MessagingService, QueueMessage};
use super::types::{MessageId, QueuedMessage, ReceiptHandle};
use crate::config::{MessagingBackendKind, MessagingConfig};
use crate::messaging::MessagingError;

#[derive(Debug, Clone)]
pub enum MessagingProvider {
    /// PostgreSQL message queue
    Pgmq(PgmqMessagingService),

    /// In-process queue, shared so callers can inspect or fault it
    InMemory(Arc<InMemoryMessagingService>),
}

impl MessagingProvider {
    /// Build the provider named by the configuration
    pub async fn from_config(config: &MessagingConfig) -> Result<Self, MessagingError> {
        match config.backend {
            MessagingBackendKind::InMemory => Ok(Self::in_memory()),
            MessagingBackendKind::Pgmq => {
                let url = config.database_url.as_deref().ok_or_else(|| {
                    MessagingError::connection("pgmq backend requires messaging.database_url")
                })?;
                Ok(Self::Pgmq(PgmqMessagingService::new(url).await?))
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryMessagingService::new()))
    }

    /// The in-memory service, when that is the active provider
    pub fn as_in_memory(&self) -> Option<&Arc<InMemoryMessagingService>> {
        match self {
            Self::InMemory(s) => Some(s),
            Self::Pgmq(_) => None,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Pgmq(s) => s.provider_name(),
            Self::InMemory(s) => s.provider_name(),
        }
    }

    pub async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        match self {
            Self::Pgmq(s) => s.ensure_queue(queue_name).await,
            Self::InMemory(s) => s.ensure_queue(queue_name).await,
        }
    }

    pub async fn send_message<T: QueueMessage>(
        &self,
        queue_name: &str,
        message: &T,
    ) -> Result<MessageId, MessagingError> {
        match self {
            Self::Pgmq(s) => s.send_message(queue_name, message).await,
            Self::InMemory(s) => s.send_message(queue_name, message).await,
        }
    }

    pub async fn receive_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage>, MessagingError> {
        match self {
            Self::Pgmq(s) => {
                s.receive_messages(queue_name, max_messages, visibility_timeout)
                    .await
            }
            Self::InMemory(s) => {
                s.receive_messages(queue_name, max_messages, visibility_timeout)
                    .await
            }
        }
    }

    pub async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        match self {
            Self::Pgmq(s) => s.ack_message(queue_name, receipt_handle).await,
            Self::InMemory(s) => s.ack_message(queue_name, receipt_handle).await,
        }
    }

    pub async fn health_check(&self) -> Result<bool, MessagingError> {
        match self {
            Self::Pgmq(s) => s.health_check().await,
            Self::InMemory(s) => s.health_check().await,
        }
    }
}
