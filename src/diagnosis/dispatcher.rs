//! # Diagnosis Dispatcher
//!
//! Marks a diagnosis pending and hands it to the work queue. When the queue
//! refuses the message the diagnosis runs on a detached task instead, so the
//! caller never waits on the reasoning engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::executor::execute_diagnosis;
use super::DiagnosisStatusStore;
use crate::clients::ReasoningEngine;
use crate::messaging::{MessageId, MessagingProvider};
use crate::models::{DiagnosisRequest, DiagnosisStatus};

/// How a dispatched diagnosis will be executed
#[derive(Debug)]
pub enum DispatchRoute {
    /// A worker will pick it up from the queue
    Queued(MessageId),
    /// Running directly; the handle completes once the status is terminal
    Direct(JoinHandle<DiagnosisStatus>),
}

impl DispatchRoute {
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct(_))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub queued: u64,
    pub direct_fallbacks: u64,
}

#[derive(Debug, Default)]
struct AtomicDispatcherStats {
    queued: AtomicU64,
    direct_fallbacks: AtomicU64,
}

pub struct DiagnosisDispatcher {
    store: Arc<DiagnosisStatusStore>,
    messaging: MessagingProvider,
    engine: Arc<dyn ReasoningEngine>,
    queue_name: String,
    stats: AtomicDispatcherStats,
}

impl std::fmt::Debug for DiagnosisDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisDispatcher")
            .field("messaging", &self.messaging.provider_name())
            .field("engine", &self.engine.name())
            .field("queue_name", &self.queue_name)
            .finish()
    }
}

impl DiagnosisDispatcher {
    pub fn new(
        store: Arc<DiagnosisStatusStore>,
        messaging: MessagingProvider,
        engine: Arc<dyn ReasoningEngine>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            messaging,
            engine,
            queue_name: queue_name.into(),
            stats: AtomicDispatcherStats::default(),
        }
    }

    /// Start a diagnosis and return without waiting for it
    pub async fn start_async(&self, request: DiagnosisRequest) -> DispatchRoute {
        let subject_id = request.assessment_id.to_string();
        self.store.set(&subject_id, "", DiagnosisStatus::Pending).await;

        match self.messaging.send_message(&self.queue_name, &request).await {
            Ok(message_id) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
                info!(
                    subject_id = %subject_id,
                    queue = %self.queue_name,
                    message_id = %message_id,
                    "🚀 Diagnosis queued"
                );
                DispatchRoute::Queued(message_id)
            }
            Err(e) => {
                self.stats.direct_fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!(
                    subject_id = %subject_id,
                    queue = %self.queue_name,
                    error = %e,
                    "⚠️ Queue unavailable, running diagnosis directly"
                );

                let engine = Arc::clone(&self.engine);
                let store = Arc::clone(&self.store);
                DispatchRoute::Direct(tokio::spawn(async move {
                    execute_diagnosis(&engine, &store, &request).await
                }))
            }
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            queued: self.stats.queued.load(Ordering::Relaxed),
            direct_fallbacks: self.stats.direct_fallbacks.load(Ordering::Relaxed),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}
