//! Audit ledger tamper detection across the public API

mod common;

use std::sync::Arc;

use assessment_core::ledger::{
    verify_signature, AuditEventType, AuditLedger, AuditStore, InMemoryAuditStore,
};
use serde_json::json;

async fn seeded_ledger(entries: usize) -> (Arc<InMemoryAuditStore>, AuditLedger) {
    common::init_test_logging();
    let store = Arc::new(InMemoryAuditStore::new());
    let ledger = AuditLedger::open(Arc::clone(&store) as Arc<dyn AuditStore>)
        .await
        .unwrap();
    for i in 0..entries {
        ledger
            .append(
                &AuditEventType::AiPrediction,
                &format!("patient-{i}"),
                &json!({ "assessment_id": i, "heart_risk": 0.3 }),
                "AI_SYSTEM",
            )
            .await
            .unwrap();
    }
    (store, ledger)
}

#[tokio::test]
async fn test_edited_payload_is_located() {
    let (store, ledger) = seeded_ledger(5).await;
    assert!(ledger.verify().await.unwrap().valid);

    let mut entries = store.all().await.unwrap();
    let mut forged = entries.remove(3);
    forged.payload_hash = "0".repeat(64);
    assert!(store.overwrite(3, forged).await);

    let report = ledger.verify().await.unwrap();
    assert!(!report.valid);
    assert_eq!(report.entry_count, 5);
    assert_eq!(report.first_divergence, Some(3));
}

#[tokio::test]
async fn test_rehashed_forgery_breaks_the_next_link() {
    let (store, ledger) = seeded_ledger(4).await;

    let mut forged = store.all().await.unwrap().remove(1);
    forged.actor_id = "intruder".to_string();
    forged.current_hash = forged.recompute_hash();
    assert!(store.overwrite(1, forged).await);

    let report = ledger.verify().await.unwrap();
    assert!(!report.valid);
    assert_eq!(report.first_divergence, Some(2));
}

#[tokio::test]
async fn test_reopened_ledger_extends_the_chain() {
    let (store, ledger) = seeded_ledger(2).await;
    let tail = ledger.last_hash().await;
    drop(ledger);

    let reopened = AuditLedger::open(Arc::clone(&store) as Arc<dyn AuditStore>)
        .await
        .unwrap();
    assert_eq!(reopened.last_hash().await, tail);

    let entry = reopened
        .append(
            &AuditEventType::DoctorFeedback,
            "patient-0",
            &json!({ "approved": false }),
            "dr-jones",
        )
        .await
        .unwrap();
    assert_eq!(entry.prev_hash, tail);
    assert!(verify_signature(&entry).unwrap());

    let report = reopened.verify().await.unwrap();
    assert!(report.valid);
    assert_eq!(report.entry_count, 3);
}

#[tokio::test]
async fn test_mirror_tracks_appends() {
    let (_store, ledger) = seeded_ledger(3).await;
    // Genesis plus one block per entry
    assert_eq!(ledger.mirror().len(), 4);
    assert!(ledger.mirror().is_valid());
}
