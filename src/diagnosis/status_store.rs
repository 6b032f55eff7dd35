//! # Diagnosis Status Store
//!
//! Per-assessment reasoning status held in a [`TieredCache`]: the shared tier
//! is the cross-process source of truth, the local tier answers when the
//! shared tier misses or is down. Consistency is eventual and bounded by the
//! entry TTL.
//!
//! Writes are last-write-wins with no ordering token. That is safe while the
//! only transition is `pending` followed by one terminal write.
//!
//! With a [`StatusRelay`] attached, every write is also published to the
//! other instances; see [`super::relay`].

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::relay::{RelayedStatus, StatusRelay};
use crate::cache::TieredCache;
use crate::models::{DiagnosisSnapshot, DiagnosisStatus, StatusChanged};

pub fn status_key(subject_id: &str) -> String {
    format!("diag:status:{subject_id}")
}

#[derive(Debug)]
pub struct DiagnosisStatusStore {
    cache: TieredCache,
    events: broadcast::Sender<StatusChanged>,
    /// Tags this store's writes on the relay
    origin: Uuid,
    relay: Option<StatusRelay>,
}

impl DiagnosisStatusStore {
    pub fn new(cache: TieredCache, broadcast_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            cache,
            events,
            origin: Uuid::new_v4(),
            relay: None,
        }
    }

    /// Also publish every write to other instances through `relay`
    pub fn with_relay(mut self, relay: StatusRelay) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn origin(&self) -> Uuid {
        self.origin
    }

    pub fn relay(&self) -> Option<&StatusRelay> {
        self.relay.as_ref()
    }

    /// Feed writes made by other instances into the local broadcast;
    /// `None` without a relay
    pub fn start_relay_forwarder(&self) -> Option<JoinHandle<()>> {
        let relay = self.relay.as_ref()?;
        debug!(origin = %self.origin, relay = relay.relay_name(), "Starting status relay forwarder");
        Some(relay.spawn_forwarder(self.origin, self.events.clone()))
    }

    /// Write through both tiers, then publish a [`StatusChanged`]
    pub async fn set(&self, subject_id: &str, text: &str, status: DiagnosisStatus) {
        let key = status_key(subject_id);
        let snapshot = DiagnosisSnapshot::new(text, status);

        match serde_json::to_string(&snapshot) {
            Ok(raw) => self.cache.set(&key, &raw).await,
            Err(e) => warn!(subject_id = %subject_id, error = %e, "Could not encode diagnosis status"),
        }

        let event = StatusChanged {
            subject_id: subject_id.to_string(),
            text: text.to_string(),
            status,
        };
        if let Some(relay) = &self.relay {
            let envelope = RelayedStatus {
                origin: self.origin,
                event: event.clone(),
            };
            if let Err(e) = relay.publish(&envelope).await {
                warn!(subject_id = %subject_id, error = %e, "Status relay publish failed");
            }
        }

        // No receivers is normal when nothing is listening
        if self.events.send(event).is_err() {
            debug!(subject_id = %subject_id, "No status listeners");
        }
    }

    /// Current status; empty text and status when the id is unknown
    pub async fn get(&self, subject_id: &str) -> DiagnosisSnapshot {
        let Some(raw) = self.cache.get(&status_key(subject_id)).await else {
            return DiagnosisSnapshot::default();
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(subject_id = %subject_id, error = %e, "Unreadable diagnosis status entry");
            DiagnosisSnapshot::default()
        })
    }

    /// Receive every status write from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChanged> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheProvider;
    use std::time::Duration;

    fn store() -> DiagnosisStatusStore {
        let cache = TieredCache::new(CacheProvider::moka(100), 100, Duration::from_secs(3600));
        DiagnosisStatusStore::new(cache, 16)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = store();
        store.set("7", "Pneumonia suspected", DiagnosisStatus::Ready).await;

        let snapshot = store.get("7").await;
        assert_eq!(snapshot.text, "Pneumonia suspected");
        assert_eq!(snapshot.status, "ready");
    }

    #[tokio::test]
    async fn test_unknown_id_is_empty() {
        let snapshot = store().get("999").await;
        assert_eq!(snapshot.text, "");
        assert_eq!(snapshot.status, "");
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = store();
        store.set("3", "", DiagnosisStatus::Pending).await;
        store.set("3", "Stable", DiagnosisStatus::Ready).await;
        assert_eq!(store.get("3").await.parsed_status(), Some(DiagnosisStatus::Ready));
    }

    #[tokio::test]
    async fn test_local_tier_answers_without_shared_cache() {
        let cache = TieredCache::new(CacheProvider::noop(), 100, Duration::from_secs(3600));
        let store = DiagnosisStatusStore::new(cache, 16);
        store.set("5", "Anemia", DiagnosisStatus::Ready).await;
        assert_eq!(store.get("5").await.text, "Anemia");
    }

    #[tokio::test]
    async fn test_every_write_is_published() {
        let store = store();
        let mut events = store.subscribe();

        store.set("9", "", DiagnosisStatus::Pending).await;
        store.set("9", "done", DiagnosisStatus::Ready).await;

        let first = events.recv().await.unwrap();
        assert_eq!(first.status, DiagnosisStatus::Pending);
        let second = events.recv().await.unwrap();
        assert_eq!(second.subject_id, "9");
        assert_eq!(second.text, "done");
    }

    #[tokio::test]
    async fn test_writes_reach_peer_store_once() {
        let relay = StatusRelay::in_memory(16);
        let here = store().with_relay(relay.clone());
        let peer = store().with_relay(relay);
        let _here_forwarder = here.start_relay_forwarder().unwrap();
        let _peer_forwarder = peer.start_relay_forwarder().unwrap();
        let mut here_events = here.subscribe();
        let mut peer_events = peer.subscribe();

        peer.set("11", "Stable", DiagnosisStatus::Ready).await;

        let relayed = tokio::time::timeout(Duration::from_secs(1), here_events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(relayed.subject_id, "11");
        assert_eq!(relayed.status, DiagnosisStatus::Ready);

        // The writer sees its own event once, not echoed back by the relay
        assert_eq!(peer_events.recv().await.unwrap().subject_id, "11");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(peer_events.try_recv().is_err());
        assert!(here_events.try_recv().is_err());
    }

    #[test]
    fn test_no_forwarder_without_relay() {
        let store = store();
        assert!(store.relay().is_none());
        assert!(store.start_relay_forwarder().is_none());
    }

    #[test]
    fn test_key_format() {
        assert_eq!(status_key("42"), "diag:status:42");
    }
}
