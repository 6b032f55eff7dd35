//! # Diagnosis Worker
//!
//! Long-lived queue consumer. Each instance claims one message at a time,
//! runs it through the reasoning engine and acks it. Malformed messages are
//! acked without processing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::executor::execute_diagnosis;
use super::DiagnosisStatusStore;
use crate::clients::ReasoningEngine;
use crate::config::MessagingConfig;
use crate::messaging::{MessagingError, MessagingProvider, QueuedMessage};
use crate::models::{DiagnosisRequest, DiagnosisStatus};

#[derive(Debug, Clone)]
pub struct DiagnosisWorkerConfig {
    pub queue_name: String,
    pub polling_interval: Duration,
    pub visibility_timeout: Duration,
    pub batch_size: usize,
}

impl Default for DiagnosisWorkerConfig {
    fn default() -> Self {
        Self {
            queue_name: "llm_tasks".to_string(),
            polling_interval: Duration::from_millis(250),
            visibility_timeout: Duration::from_secs(120),
            batch_size: 1,
        }
    }
}

impl From<&MessagingConfig> for DiagnosisWorkerConfig {
    fn from(config: &MessagingConfig) -> Self {
        Self {
            queue_name: config.diagnosis_queue.clone(),
            polling_interval: Duration::from_millis(config.poll_interval_ms),
            visibility_timeout: Duration::from_secs(config.visibility_timeout_seconds),
            batch_size: config.batch_size as usize,
        }
    }
}

#[derive(Debug, Default)]
struct AtomicWorkerStats {
    polling_cycles: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    polling_errors: AtomicU64,
}

/// Snapshot of worker counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosisWorkerStats {
    pub polling_cycles: u64,
    /// Messages that reached `ready`
    pub processed: u64,
    /// Messages that reached `error`
    pub failed: u64,
    /// Malformed messages discarded
    pub dropped: u64,
    pub polling_errors: u64,
}

pub struct DiagnosisWorker {
    worker_id: Uuid,
    config: DiagnosisWorkerConfig,
    messaging: MessagingProvider,
    engine: Arc<dyn ReasoningEngine>,
    store: Arc<DiagnosisStatusStore>,
    is_running: Arc<AtomicBool>,
    stats: Arc<AtomicWorkerStats>,
}

impl std::fmt::Debug for DiagnosisWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisWorker")
            .field("worker_id", &self.worker_id)
            .field("config", &self.config)
            .field("messaging", &self.messaging.provider_name())
            .field("is_running", &self.is_running.load(Ordering::Relaxed))
            .finish()
    }
}

impl DiagnosisWorker {
    pub fn new(
        config: DiagnosisWorkerConfig,
        messaging: MessagingProvider,
        engine: Arc<dyn ReasoningEngine>,
        store: Arc<DiagnosisStatusStore>,
    ) -> Self {
        let worker_id = Uuid::new_v4();
        info!(
            worker_id = %worker_id,
            queue = %config.queue_name,
            polling_interval = ?config.polling_interval,
            "Creating DiagnosisWorker"
        );
        Self {
            worker_id,
            config,
            messaging,
            engine,
            store,
            is_running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(AtomicWorkerStats::default()),
        }
    }

    /// Spawn the polling loop; `None` if already running
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!(worker_id = %self.worker_id, "DiagnosisWorker already running");
            return None;
        }

        info!(worker_id = %self.worker_id, queue = %self.config.queue_name, "👷 Starting DiagnosisWorker");

        let worker_id = self.worker_id;
        let config = self.config.clone();
        let messaging = self.messaging.clone();
        let engine = Arc::clone(&self.engine);
        let store = Arc::clone(&self.store);
        let is_running = Arc::clone(&self.is_running);
        let stats = Arc::clone(&self.stats);

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.polling_interval);

            while is_running.load(Ordering::SeqCst) {
                interval.tick().await;
                stats.polling_cycles.fetch_add(1, Ordering::Relaxed);

                if let Err(e) =
                    Self::poll_once(&config, &messaging, &engine, &store, &stats).await
                {
                    stats.polling_errors.fetch_add(1, Ordering::Relaxed);
                    error!(worker_id = %worker_id, error = %e, "Diagnosis queue poll failed");
                }
            }

            info!(worker_id = %worker_id, "DiagnosisWorker stopped");
        }))
    }

    /// Ask the loop to exit after its current cycle
    pub fn stop(&self) {
        if self.is_running.swap(false, Ordering::SeqCst) {
            info!(worker_id = %self.worker_id, "Stopping DiagnosisWorker");
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> DiagnosisWorkerStats {
        DiagnosisWorkerStats {
            polling_cycles: self.stats.polling_cycles.load(Ordering::Relaxed),
            processed: self.stats.processed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
            polling_errors: self.stats.polling_errors.load(Ordering::Relaxed),
        }
    }

    /// Run a single poll cycle inline
    pub async fn poll_now(&self) -> Result<(), MessagingError> {
        Self::poll_once(
            &self.config,
            &self.messaging,
            &self.engine,
            &self.store,
            &self.stats,
        )
        .await
    }

    async fn poll_once(
        config: &DiagnosisWorkerConfig,
        messaging: &MessagingProvider,
        engine: &Arc<dyn ReasoningEngine>,
        store: &DiagnosisStatusStore,
        stats: &AtomicWorkerStats,
    ) -> Result<(), MessagingError> {
        let messages = messaging
            .receive_messages(
                &config.queue_name,
                config.batch_size,
                config.visibility_timeout,
            )
            .await?;

        if messages.is_empty() {
            return Ok(());
        }
        debug!(queue = %config.queue_name, count = messages.len(), "Claimed diagnosis messages");

        for message in messages {
            Self::handle_message(config, messaging, engine, store, stats, &message).await?;
        }
        Ok(())
    }

    async fn handle_message(
        config: &DiagnosisWorkerConfig,
        messaging: &MessagingProvider,
        engine: &Arc<dyn ReasoningEngine>,
        store: &DiagnosisStatusStore,
        stats: &AtomicWorkerStats,
        message: &QueuedMessage,
    ) -> Result<(), MessagingError> {
        match message.decode::<DiagnosisRequest>() {
            Ok(request) => {
                info!(
                    subject_id = request.assessment_id,
                    receive_count = message.receive_count,
                    "🤖 Processing diagnosis"
                );
                match execute_diagnosis(engine, store, &request).await {
                    DiagnosisStatus::Ready => stats.processed.fetch_add(1, Ordering::Relaxed),
                    _ => stats.failed.fetch_add(1, Ordering::Relaxed),
                };
            }
            Err(e) => {
                stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    queue = %config.queue_name,
                    receipt = %message.receipt_handle.as_str(),
                    error = %e,
                    "Dropping malformed diagnosis message"
                );
            }
        }

        messaging
            .ack_message(&config.queue_name, &message.receipt_handle)
            .await
    }
}

impl Drop for DiagnosisWorker {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
    }
}
