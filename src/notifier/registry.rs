//! # Subscription Registry
//!
//! Subject id to open viewer connections. Subscribe and unsubscribe take the
//! write lock; broadcast holds the read lock only for its fan-out loop.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use super::protocol::ServerMessage;
use super::NotifierError;
use crate::models::StatusChanged;

pub type ConnectionId = Uuid;

/// Outbound side of one viewer connection
///
/// Delivery must not block: a slow viewer fails its own write rather than
/// holding up the fan-out.
pub trait ViewerSink: Send + Sync + 'static {
    fn deliver(&self, message: &ServerMessage) -> Result<(), NotifierError>;
}

/// Sink backed by a bounded channel drained by the connection's writer task
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ServerMessage>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ServerMessage>) -> Self {
        Self { tx }
    }
}

impl ViewerSink for ChannelSink {
    fn deliver(&self, message: &ServerMessage) -> Result<(), NotifierError> {
        self.tx.try_send(message.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifierError::ViewerBackedUp,
            mpsc::error::TrySendError::Closed(_) => NotifierError::ViewerGone,
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

type Subscribers = HashMap<ConnectionId, Arc<dyn ViewerSink>>;

#[derive(Default)]
pub struct SubscriptionRegistry {
    subjects: RwLock<HashMap<String, Subscribers>>,
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry").finish_non_exhaustive()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a subject's set; repeating is harmless
    pub async fn subscribe(
        &self,
        subject_id: &str,
        connection_id: ConnectionId,
        sink: Arc<dyn ViewerSink>,
    ) {
        let mut subjects = self.subjects.write().await;
        subjects
            .entry(subject_id.to_string())
            .or_default()
            .insert(connection_id, sink);
        debug!(subject_id = %subject_id, connection_id = %connection_id, "Viewer subscribed");
    }

    /// Remove a connection from every subject; returns how many sets it left
    pub async fn unsubscribe_all(&self, connection_id: ConnectionId) -> usize {
        let mut subjects = self.subjects.write().await;
        let mut removed = 0;
        subjects.retain(|_, subscribers| {
            if subscribers.remove(&connection_id).is_some() {
                removed += 1;
            }
            !subscribers.is_empty()
        });
        debug!(connection_id = %connection_id, removed, "Viewer unsubscribed");
        removed
    }

    /// Push an event to the subject's viewers; failures are logged, not retried
    pub async fn broadcast(&self, event: &StatusChanged) -> BroadcastReport {
        let message = ServerMessage::from(event);
        let mut report = BroadcastReport::default();

        let subjects = self.subjects.read().await;
        let Some(subscribers) = subjects.get(&event.subject_id) else {
            return report;
        };

        for (connection_id, sink) in subscribers {
            match sink.deliver(&message) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        subject_id = %event.subject_id,
                        connection_id = %connection_id,
                        error = %e,
                        "Status update not delivered"
                    );
                }
            }
        }

        report
    }

    pub async fn subscriber_count(&self, subject_id: &str) -> usize {
        self.subjects
            .read()
            .await
            .get(subject_id)
            .map_or(0, HashMap::len)
    }

    pub async fn subject_count(&self) -> usize {
        self.subjects.read().await.len()
    }
}
