//! # Audit Ledger
//!
//! Append-only, hash-chained, signed record of clinically significant
//! events. Appends are serialized by a single writer lock that guards the
//! remembered tail hash. Verification and export read the store without
//! taking that lock and may miss an in-flight append.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::backup::{seal, BackupReceipt, ContentStore};
use super::entry::{AuditEntry, AuditEventType};
use super::errors::LedgerResult;
use super::hashing::{entry_hash, sha256_hex, GENESIS};
use super::mirror::LedgerMirror;
use super::signing::LedgerSigner;
use super::store::AuditStore;
use crate::logging::log_ledger_operation;

/// Result of replaying the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub valid: bool,
    pub entry_count: usize,
    /// Index of the first entry whose link or hash does not check out
    pub first_divergence: Option<usize>,
}

pub struct AuditLedger {
    store: Arc<dyn AuditStore>,
    signer: LedgerSigner,
    last_hash: Mutex<String>,
    mirror: LedgerMirror,
}

impl std::fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLedger")
            .field("store", &self.store.backend_name())
            .field("signer", &self.signer)
            .field("mirror_blocks", &self.mirror.len())
            .finish()
    }
}

impl AuditLedger {
    /// Open a ledger over `store`, resuming from its last entry
    pub async fn open(store: Arc<dyn AuditStore>) -> LedgerResult<Self> {
        let last_hash = store
            .last()
            .await?
            .map(|entry| entry.current_hash)
            .unwrap_or_else(|| GENESIS.to_string());

        let signer = LedgerSigner::generate();
        info!(
            backend = store.backend_name(),
            resumed = last_hash != GENESIS,
            public_key = %signer.public_key_hex(),
            "🔗 Audit ledger opened"
        );

        Ok(Self {
            store,
            signer,
            last_hash: Mutex::new(last_hash),
            mirror: LedgerMirror::new(),
        })
    }

    /// Append one event and return the stored entry
    pub async fn append<P: Serialize + ?Sized>(
        &self,
        event_type: &AuditEventType,
        subject_id: &str,
        payload: &P,
        actor_id: &str,
    ) -> LedgerResult<AuditEntry> {
        let payload_bytes = serde_json::to_vec(payload)?;
        let subject_hash = sha256_hex(subject_id.as_bytes());
        let payload_hash = sha256_hex(&payload_bytes);

        let mut last_hash = self.last_hash.lock().await;

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        let event_name = event_type.as_str().to_string();
        let current_hash = entry_hash(
            &timestamp,
            &event_name,
            &subject_hash,
            &payload_hash,
            &last_hash,
            actor_id,
        );
        let entry = AuditEntry {
            actor_signature: self.signer.sign(&payload_hash, &timestamp),
            actor_public_key: self.signer.public_key_hex(),
            timestamp,
            event_type: event_name,
            subject_hash,
            payload_hash,
            prev_hash: last_hash.clone(),
            current_hash,
            actor_id: actor_id.to_string(),
        };

        if let Err(e) = self.store.append(&entry).await {
            warn!(event_type = %entry.event_type, error = %e, "Audit append failed");
            return Err(e);
        }
        *last_hash = entry.current_hash.clone();

        self.mirror.add_block(serde_json::json!({
            "event_type": entry.event_type,
            "subject_hash": entry.subject_hash,
            "data_hash": entry.payload_hash,
            "timestamp": entry.timestamp,
            "actor": entry.actor_id,
            "signature": entry.actor_signature,
        }));
        drop(last_hash);

        log_ledger_operation(
            "append",
            Some(&entry.event_type),
            None,
            "ok",
            Some(&entry.current_hash),
        );
        Ok(entry)
    }

    /// Replay the stored chain and report the first broken link, if any
    pub async fn verify(&self) -> LedgerResult<VerifyReport> {
        let entries = self.store.all().await?;
        let report = verify_entries(&entries);

        log_ledger_operation(
            "verify",
            None,
            Some(report.entry_count),
            if report.valid { "valid" } else { "diverged" },
            report
                .first_divergence
                .map(|i| format!("first divergence at {i}"))
                .as_deref(),
        );
        Ok(report)
    }

    /// Every entry, oldest first, as JSON
    pub async fn export(&self) -> LedgerResult<Vec<u8>> {
        let entries = self.store.all().await?;
        log_ledger_operation("export", None, Some(entries.len()), "ok", None);
        Ok(serde_json::to_vec(&entries)?)
    }

    /// Export, seal under a fresh session key and store
    pub async fn backup(&self, content_store: &dyn ContentStore) -> LedgerResult<BackupReceipt> {
        let export = self.export().await?;
        let (blob, key) = seal(&export)?;
        let size_bytes = blob.len();
        let content_id = content_store.put(blob).await?;

        log_ledger_operation("backup", None, None, "ok", Some(&content_id));
        Ok(BackupReceipt {
            content_id,
            session_key_hex: hex::encode(key),
            size_bytes,
        })
    }

    pub fn mirror(&self) -> &LedgerMirror {
        &self.mirror
    }

    pub fn public_key_hex(&self) -> String {
        self.signer.public_key_hex()
    }

    pub async fn last_hash(&self) -> String {
        self.last_hash.lock().await.clone()
    }
}

/// Check linkage and stored hashes in order
pub fn verify_entries(entries: &[AuditEntry]) -> VerifyReport {
    let mut expected_prev = GENESIS;
    let first_divergence = entries.iter().position(|entry| {
        let broken = entry.prev_hash != expected_prev || entry.recompute_hash() != entry.current_hash;
        expected_prev = &entry.current_hash;
        broken
    });

    VerifyReport {
        valid: first_divergence.is_none(),
        entry_count: entries.len(),
        first_divergence,
    }
}
