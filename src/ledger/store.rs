//! # Audit Stores
//!
//! Durable, append-only persistence for audit entries, read back in
//! insertion order.

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::info;

use super::entry::AuditEntry;
use super::errors::{LedgerError, LedgerResult};

#[async_trait]
pub trait AuditStore: Send + Sync + 'static {
    async fn append(&self, entry: &AuditEntry) -> LedgerResult<()>;

    /// Most recently appended entry
    async fn last(&self) -> LedgerResult<Option<AuditEntry>>;

    /// Every entry, oldest first
    async fn all(&self) -> LedgerResult<Vec<AuditEntry>>;

    fn backend_name(&self) -> &'static str;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a stored entry in place
    ///
    /// The ledger itself never does this. It exists so integrity checks can
    /// be exercised against a tampered log.
    pub async fn overwrite(&self, index: usize, entry: AuditEntry) -> bool {
        match self.entries.write().await.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &AuditEntry) -> LedgerResult<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn last(&self) -> LedgerResult<Option<AuditEntry>> {
        Ok(self.entries.read().await.last().cloned())
    }

    async fn all(&self) -> LedgerResult<Vec<AuditEntry>> {
        Ok(self.entries.read().await.clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

const CREATE_AUDIT_LOG: &str = r#"
CREATE TABLE IF NOT EXISTS audit_log (
    id BIGSERIAL PRIMARY KEY,
    timestamp TEXT NOT NULL,
    event_type TEXT NOT NULL,
    subject_hash TEXT NOT NULL,
    payload_hash TEXT NOT NULL,
    prev_hash TEXT NOT NULL,
    current_hash TEXT NOT NULL UNIQUE,
    actor_id TEXT NOT NULL,
    actor_signature TEXT NOT NULL,
    actor_public_key TEXT NOT NULL
)
"#;

const SELECT_COLUMNS: &str = "timestamp, event_type, subject_hash, payload_hash, prev_hash, \
     current_hash, actor_id, actor_signature, actor_public_key";

/// PostgreSQL store over the `audit_log` table
#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub async fn connect(database_url: &str) -> LedgerResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Self::with_pool(pool).await
    }

    /// Use an existing pool, creating the table if needed
    pub async fn with_pool(pool: PgPool) -> LedgerResult<Self> {
        sqlx::query(CREATE_AUDIT_LOG).execute(&pool).await?;
        info!("✅ audit_log table ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: &AuditEntry) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO audit_log (timestamp, event_type, subject_hash, payload_hash, prev_hash, \
             current_hash, actor_id, actor_signature, actor_public_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&entry.timestamp)
        .bind(&entry.event_type)
        .bind(&entry.subject_hash)
        .bind(&entry.payload_hash)
        .bind(&entry.prev_hash)
        .bind(&entry.current_hash)
        .bind(&entry.actor_id)
        .bind(&entry.actor_signature)
        .bind(&entry.actor_public_key)
        .execute(&self.pool)
        .await
        .map_err(LedgerError::from)?;
        Ok(())
    }

    async fn last(&self) -> LedgerResult<Option<AuditEntry>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM audit_log ORDER BY id DESC LIMIT 1");
        Ok(sqlx::query_as::<_, AuditEntry>(&sql)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn all(&self) -> LedgerResult<Vec<AuditEntry>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM audit_log ORDER BY id ASC");
        Ok(sqlx::query_as::<_, AuditEntry>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
