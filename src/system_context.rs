//! # System Context
//!
//! Builds every component from configuration and hands them out behind
//! `Arc`s. Nothing here is global; tests build as many contexts as they like.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{CacheProvider, TieredCache};
use crate::clients::{HttpReasoningEngine, HttpRiskScoringEngine, ReasoningEngine, RiskScoringEngine};
use crate::config::{CacheBackendKind, ConfigManager, LedgerBackendKind};
use crate::diagnosis::{
    DiagnosisDispatcher, DiagnosisStatusStore, DiagnosisWorker, DiagnosisWorkerConfig, StatusRelay,
};
use crate::errors::{AssessmentError, AssessmentResult};
use crate::gateway::ResilienceGateway;
use crate::ledger::{
    AuditLedger, AuditStore, ContentStore, FileContentStore, InMemoryAuditStore, InMemoryContentStore,
    PgAuditStore,
};
use crate::messaging::MessagingProvider;
use crate::notifier::{NotificationListener, SubscriptionRegistry};
use crate::resilience::CircuitBreaker;

pub struct SystemContext {
    pub system_id: Uuid,
    pub config_manager: Arc<ConfigManager>,
    pub gateway: Arc<ResilienceGateway>,
    pub status_store: Arc<DiagnosisStatusStore>,
    pub dispatcher: Arc<DiagnosisDispatcher>,
    pub messaging: MessagingProvider,
    pub reasoning_engine: Arc<dyn ReasoningEngine>,
    /// Absent when auditing is disabled
    pub ledger: Option<Arc<AuditLedger>>,
    pub content_store: Arc<dyn ContentStore>,
    pub subscriptions: Arc<SubscriptionRegistry>,
}

impl std::fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemContext")
            .field("system_id", &self.system_id)
            .field("environment", &self.config_manager.environment())
            .field("gateway", &self.gateway)
            .field("messaging", &self.messaging.provider_name())
            .field("ledger_enabled", &self.ledger.is_some())
            .finish()
    }
}

impl SystemContext {
    /// Load configuration from the environment and build everything
    pub async fn new() -> AssessmentResult<Self> {
        let config_manager = ConfigManager::load()?;
        Self::from_config(config_manager).await
    }

    /// Build with HTTP clients for both engines
    pub async fn from_config(config_manager: Arc<ConfigManager>) -> AssessmentResult<Self> {
        let config = config_manager.config();
        let scoring: Arc<dyn RiskScoringEngine> =
            Arc::new(HttpRiskScoringEngine::new(&config.scoring)?);
        let reasoning: Arc<dyn ReasoningEngine> =
            Arc::new(HttpReasoningEngine::new(&config.reasoning)?);
        Self::with_engines(config_manager, scoring, reasoning).await
    }

    /// Build around caller-supplied engines
    pub async fn with_engines(
        config_manager: Arc<ConfigManager>,
        scoring_engine: Arc<dyn RiskScoringEngine>,
        reasoning_engine: Arc<dyn ReasoningEngine>,
    ) -> AssessmentResult<Self> {
        let relay = Self::relay_from_config(&config_manager).await;
        Self::with_engines_and_relay(config_manager, scoring_engine, reasoning_engine, relay).await
    }

    /// Build with an explicit status relay; contexts sharing one relay see
    /// each other's status writes
    pub async fn with_engines_and_relay(
        config_manager: Arc<ConfigManager>,
        scoring_engine: Arc<dyn RiskScoringEngine>,
        reasoning_engine: Arc<dyn ReasoningEngine>,
        relay: Option<StatusRelay>,
    ) -> AssessmentResult<Self> {
        let system_id = Uuid::new_v4();
        let config = config_manager.config();
        info!(system_id = %system_id, environment = %config_manager.environment(), "🏗️ Building system context");

        let shared_cache = CacheProvider::from_config_graceful(&config.cache).await;
        let cache_provider = shared_cache.provider_name();

        let breaker = Arc::new(CircuitBreaker::new(
            "scoring_engine",
            config.circuit_breaker.to_breaker_config(),
        ));
        let gateway = Arc::new(ResilienceGateway::new(
            scoring_engine,
            shared_cache.clone(),
            breaker,
            config.scoring.cache_ttl(),
        ));

        let mut status_store = DiagnosisStatusStore::new(
            TieredCache::new(
                shared_cache,
                config.cache.local_max_capacity,
                config.cache.status_ttl(),
            ),
            config.notifier.broadcast_capacity,
        );
        if let Some(relay) = relay {
            status_store = status_store.with_relay(relay);
        }
        let status_store = Arc::new(status_store);

        let messaging = MessagingProvider::from_config(&config.messaging).await?;
        if let Err(e) = messaging.ensure_queue(&config.messaging.diagnosis_queue).await {
            warn!(
                queue = %config.messaging.diagnosis_queue,
                error = %e,
                "Diagnosis queue unavailable, dispatch will run diagnoses directly"
            );
        }

        let dispatcher = Arc::new(DiagnosisDispatcher::new(
            Arc::clone(&status_store),
            messaging.clone(),
            Arc::clone(&reasoning_engine),
            config.messaging.diagnosis_queue.clone(),
        ));

        let ledger = if config.ledger.enabled {
            let store: Arc<dyn AuditStore> = match config.ledger.backend {
                LedgerBackendKind::Memory => Arc::new(InMemoryAuditStore::new()),
                LedgerBackendKind::Postgres => {
                    let url = config.ledger.database_url.as_deref().ok_or_else(|| {
                        AssessmentError::ConfigurationError(
                            "postgres ledger backend requires ledger.database_url".to_string(),
                        )
                    })?;
                    Arc::new(PgAuditStore::connect(url).await?)
                }
            };
            Some(Arc::new(AuditLedger::open(store).await?))
        } else {
            info!("Audit ledger disabled by configuration");
            None
        };

        let content_store: Arc<dyn ContentStore> = match &config.backup.directory {
            Some(directory) => Arc::new(FileContentStore::new(directory).await?),
            None => Arc::new(InMemoryContentStore::new()),
        };

        info!(
            system_id = %system_id,
            cache = cache_provider,
            messaging = messaging.provider_name(),
            ledger = ledger.is_some(),
            relay = status_store.relay().map(StatusRelay::relay_name),
            "✅ System context ready"
        );

        Ok(Self {
            system_id,
            config_manager,
            gateway,
            status_store,
            dispatcher,
            messaging,
            reasoning_engine,
            ledger,
            content_store,
            subscriptions: Arc::new(SubscriptionRegistry::new()),
        })
    }

    /// A queue worker wired to this context; call `start` to run it
    pub fn diagnosis_worker(&self) -> DiagnosisWorker {
        DiagnosisWorker::new(
            DiagnosisWorkerConfig::from(&self.config_manager.config().messaging),
            self.messaging.clone(),
            Arc::clone(&self.reasoning_engine),
            Arc::clone(&self.status_store),
        )
    }

    /// Start pushing status changes to viewers, if the notifier is enabled
    /// Redis relay when the shared cache is Redis; a connection failure
    /// leaves the instance with in-process notification only
    async fn relay_from_config(config_manager: &ConfigManager) -> Option<StatusRelay> {
        let config = config_manager.config();
        if config.cache.backend != CacheBackendKind::Redis {
            return None;
        }
        let url = config.cache.redis_url.as_deref()?;

        match StatusRelay::redis(url, &config.notifier.relay_channel).await {
            Ok(relay) => Some(relay),
            Err(e) => {
                warn!(
                    error = %e,
                    "Status relay unavailable, notifications stay local to this instance"
                );
                None
            }
        }
    }

    /// Forward status writes made by other instances to local listeners
    pub fn start_status_relay(&self) -> Option<JoinHandle<()>> {
        if !self.config_manager.config().notifier.enabled {
            return None;
        }
        self.status_store.start_relay_forwarder()
    }

    pub fn start_notification_listener(&self) -> Option<JoinHandle<()>> {
        if !self.config_manager.config().notifier.enabled {
            info!("Realtime notifier disabled by configuration");
            return None;
        }
        let listener = NotificationListener::new(Arc::clone(&self.subscriptions));
        Some(listener.spawn(self.status_store.subscribe()))
    }
}
