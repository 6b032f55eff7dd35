//! # Status Relay
//!
//! Carries [`StatusChanged`] events between orchestrator instances. Every
//! store publishes its writes tagged with its own origin id; a forwarder
//! task re-emits events from *other* origins on the local broadcast channel,
//! so each instance's notifier sees every write exactly once.
//!
//! ```text
//! instance A                        instance B
//! store.set ──► local broadcast     store.set ──► local broadcast
//!      └──► relay ◄─────────────────────┘
//!             └── forwarder (skips own origin) ──► local broadcast
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::providers::redis::redact_url;
use crate::messaging::MessagingError;
use crate::models::StatusChanged;

pub const DEFAULT_RELAY_CHANNEL: &str = "diagnosis_updates";

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Wire envelope for relayed events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayedStatus {
    pub origin: Uuid,
    pub event: StatusChanged,
}

/// Relay backend, enum-dispatched like the other providers
#[derive(Debug, Clone)]
pub enum StatusRelay {
    InMemory(Arc<InMemoryStatusRelay>),
    Redis(RedisStatusRelay),
}

impl StatusRelay {
    /// Process-local relay, shared by cloning; used by tests and
    /// multi-context single-process setups
    pub fn in_memory(capacity: usize) -> Self {
        Self::InMemory(Arc::new(InMemoryStatusRelay::new(capacity)))
    }

    /// Redis pub/sub relay on `channel`
    pub async fn redis(url: &str, channel: &str) -> Result<Self, MessagingError> {
        Ok(Self::Redis(RedisStatusRelay::connect(url, channel).await?))
    }

    pub fn relay_name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "in_memory",
            Self::Redis(_) => "redis",
        }
    }

    pub async fn publish(&self, envelope: &RelayedStatus) -> Result<(), MessagingError> {
        match self {
            Self::InMemory(relay) => {
                relay.publish(envelope);
                Ok(())
            }
            Self::Redis(relay) => relay.publish(envelope).await,
        }
    }

    /// Forward events from other origins into `local` until aborted
    pub fn spawn_forwarder(
        &self,
        origin: Uuid,
        local: broadcast::Sender<StatusChanged>,
    ) -> JoinHandle<()> {
        match self {
            Self::InMemory(relay) => relay.spawn_forwarder(origin, local),
            Self::Redis(relay) => relay.spawn_forwarder(origin, local),
        }
    }
}

/// Re-emit a relayed event locally unless it started here
fn forward(origin: Uuid, local: &broadcast::Sender<StatusChanged>, envelope: RelayedStatus) -> bool {
    if envelope.origin == origin {
        return false;
    }
    debug!(
        subject_id = %envelope.event.subject_id,
        from = %envelope.origin,
        "Relayed status update received"
    );
    // No local receivers is fine
    let _ = local.send(envelope.event);
    true
}

#[derive(Debug)]
pub struct InMemoryStatusRelay {
    sender: broadcast::Sender<RelayedStatus>,
}

impl InMemoryStatusRelay {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    fn publish(&self, envelope: &RelayedStatus) {
        let _ = self.sender.send(envelope.clone());
    }

    fn spawn_forwarder(
        &self,
        origin: Uuid,
        local: broadcast::Sender<StatusChanged>,
    ) -> JoinHandle<()> {
        // Subscribe before spawning so nothing published afterwards is missed
        let mut relayed = self.sender.subscribe();
        tokio::spawn(async move {
            loop {
                match relayed.recv().await {
                    Ok(envelope) => {
                        forward(origin, &local, envelope);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Status relay lagged, events skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Redis pub/sub relay; publishing reuses a `ConnectionManager`, the
/// forwarder holds its own pub/sub connection and reconnects on loss
#[derive(Clone)]
pub struct RedisStatusRelay {
    client: redis::Client,
    connection_manager: redis::aio::ConnectionManager,
    channel: String,
}

impl std::fmt::Debug for RedisStatusRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStatusRelay")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl RedisStatusRelay {
    pub async fn connect(url: &str, channel: &str) -> Result<Self, MessagingError> {
        let client = redis::Client::open(url).map_err(|e| {
            MessagingError::connection(format!("Failed to create Redis client: {e}"))
        })?;
        let connection_manager = redis::aio::ConnectionManager::new(client.clone())
            .await
            .map_err(|e| MessagingError::connection(format!("Failed to connect to Redis: {e}")))?;

        info!(url = %redact_url(url), channel = %channel, "📡 Redis status relay connected");

        Ok(Self {
            client,
            connection_manager,
            channel: channel.to_string(),
        })
    }

    async fn publish(&self, envelope: &RelayedStatus) -> Result<(), MessagingError> {
        let payload = serde_json::to_string(envelope)?;
        let mut conn = self.connection_manager.clone();
        redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| MessagingError::queue_operation(&self.channel, "publish", e.to_string()))?;
        Ok(())
    }

    fn spawn_forwarder(
        &self,
        origin: Uuid,
        local: broadcast::Sender<StatusChanged>,
    ) -> JoinHandle<()> {
        let client = self.client.clone();
        let channel = self.channel.clone();

        tokio::spawn(async move {
            loop {
                match client.get_async_pubsub().await {
                    Ok(mut pubsub) => match pubsub.subscribe(&channel).await {
                        Ok(()) => {
                            info!(channel = %channel, "Status relay subscribed");
                            let mut messages = pubsub.on_message();
                            while let Some(message) = messages.next().await {
                                let payload: String = match message.get_payload() {
                                    Ok(payload) => payload,
                                    Err(e) => {
                                        warn!(error = %e, "Unreadable relay payload");
                                        continue;
                                    }
                                };
                                match serde_json::from_str::<RelayedStatus>(&payload) {
                                    Ok(envelope) => {
                                        forward(origin, &local, envelope);
                                    }
                                    Err(e) => warn!(error = %e, "Malformed relay message dropped"),
                                }
                            }
                            warn!(channel = %channel, "Status relay subscription ended");
                        }
                        Err(e) => warn!(channel = %channel, error = %e, "Status relay subscribe failed"),
                    },
                    Err(e) => warn!(error = %e, "Status relay connection failed"),
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        })
    }
}
