//! End-to-end assessment flow over in-process backends

mod common;

use std::time::Duration;

use assessment_core::config::AssessmentConfig;
use assessment_core::ledger::backup;
use assessment_core::models::{DiagnosisStatus, RiskSource};
use assessment_core::resilience::CircuitState;
use assessment_core::{AssessmentCoordinator, AssessmentRequest, DoctorFeedback};
use tracing::info;

use common::{build_system, build_system_with, sample_vitals};

fn request(assessment_id: i64) -> AssessmentRequest {
    AssessmentRequest {
        assessment_id,
        vitals: sample_vitals(),
        past_context: "Prior visit: elevated BP".to_string(),
    }
}

#[tokio::test]
async fn test_assessment_queues_diagnosis_and_worker_completes_it() {
    let system = build_system().await;
    let coordinator = AssessmentCoordinator::new(system.context.clone());

    info!("🧪 Running assessment through the coordinator");
    let outcome = coordinator.assess("patient-7", request(101)).await;

    assert_eq!(outcome.risk_source, RiskSource::Engine);
    assert!(!outcome.confidence_downgraded);
    assert_eq!(outcome.risk.heart_risk, 0.42);
    assert_eq!(outcome.medications.risky, vec!["Metformin 500mg"]);
    assert_eq!(outcome.medications.safe, vec!["Lisinopril"]);
    assert!(outcome.audit_hash.is_some());
    assert!(!outcome.diagnosis_direct);
    assert_eq!(outcome.diagnosis.parsed_status(), Some(DiagnosisStatus::Pending));

    let pending = coordinator.diagnosis_status("101").await;
    assert_eq!(pending.parsed_status(), Some(DiagnosisStatus::Pending));
    assert_eq!(system.context.dispatcher.stats().queued, 1);

    let worker = system.context.diagnosis_worker();
    worker.poll_now().await.unwrap();

    let ready = coordinator.diagnosis_status("101").await;
    assert_eq!(ready.parsed_status(), Some(DiagnosisStatus::Ready));
    assert_eq!(ready.text, "Assessment 101: monitor blood pressure");
    assert_eq!(system.reasoning.calls(), 1);
    assert_eq!(worker.stats().processed, 1);

    let queue = system
        .context
        .messaging
        .as_in_memory()
        .expect("in-memory messaging");
    assert_eq!(queue.queue_length("llm_tasks").await, 0);
}

#[tokio::test]
async fn test_repeat_assessment_is_served_from_cache() {
    let system = build_system().await;
    let coordinator = AssessmentCoordinator::new(system.context.clone());

    coordinator.assess("patient-7", request(1)).await;
    let second = coordinator.assess("patient-7", request(2)).await;

    assert_eq!(second.risk_source, RiskSource::Cache);
    assert_eq!(system.scoring.calls(), 1);

    // Same vitals for another subject is a separate cache entry
    let other = coordinator.assess("patient-8", request(3)).await;
    assert_eq!(other.risk_source, RiskSource::Engine);
    assert_eq!(system.scoring.calls(), 2);
}

#[tokio::test]
async fn test_scoring_outage_falls_back_to_heuristic() {
    let system = build_system().await;
    system.scoring.set_failing(true);
    let coordinator = AssessmentCoordinator::new(system.context.clone());

    let outcome = coordinator.assess("patient-9", request(55)).await;

    assert_eq!(outcome.risk_source, RiskSource::Heuristic);
    assert!(outcome.confidence_downgraded);
    assert_eq!(outcome.risk.confidence, 0.5);
    assert_eq!(outcome.risk.kidney_risk, 0.0);
    // The assessment is still audited and dispatched
    assert!(outcome.audit_hash.is_some());
    assert_eq!(system.context.dispatcher.stats().queued, 1);
}

#[tokio::test]
async fn test_breaker_opens_then_cached_subjects_still_hit() {
    let system = build_system().await;
    let coordinator = AssessmentCoordinator::new(system.context.clone());

    coordinator.assess("cached-subject", request(1)).await;
    system.scoring.set_failing(true);

    for i in 0..5 {
        coordinator.assess(&format!("subject-{i}"), request(10 + i)).await;
    }
    assert_eq!(system.context.gateway.breaker().state(), CircuitState::Open);
    let calls_when_open = system.scoring.calls();

    let rejected = coordinator.assess("subject-new", request(20)).await;
    assert_eq!(rejected.risk_source, RiskSource::Heuristic);
    assert_eq!(system.scoring.calls(), calls_when_open);

    let cached = coordinator.assess("cached-subject", request(21)).await;
    assert_eq!(cached.risk_source, RiskSource::Cache);
}

#[tokio::test]
async fn test_feedback_verify_and_backup() {
    let system = build_system().await;
    let coordinator = AssessmentCoordinator::new(system.context.clone());

    coordinator.assess("patient-1", request(1)).await;
    coordinator.assess("patient-2", request(2)).await;
    let feedback = coordinator
        .record_feedback(
            "patient-1",
            &DoctorFeedback {
                assessment_id: 1,
                approved: true,
                notes: "Agree with plan".to_string(),
            },
            "dr-smith",
        )
        .await
        .unwrap();
    assert_eq!(feedback.actor_id, "dr-smith");
    assert_ne!(feedback.subject_hash, "patient-1");

    let report = coordinator.verify_ledger().await.unwrap();
    assert!(report.valid);
    assert_eq!(report.entry_count, 3);
    assert_eq!(report.first_divergence, None);

    let receipt = coordinator.backup_ledger().await.unwrap();
    let sealed = system
        .context
        .content_store
        .get(&receipt.content_id)
        .await
        .unwrap()
        .expect("backup blob stored");
    let plain = backup::open(&sealed, &receipt.session_key_hex).unwrap();
    assert_eq!(plain, coordinator.export_ledger().await.unwrap());
}

#[tokio::test]
async fn test_disabled_ledger_skips_audit() {
    let mut config = AssessmentConfig::default();
    config.ledger.enabled = false;
    let system = build_system_with(config).await;
    let coordinator = AssessmentCoordinator::new(system.context.clone());

    let outcome = coordinator.assess("patient-1", request(1)).await;
    assert!(outcome.audit_hash.is_none());
    assert!(coordinator.verify_ledger().await.is_err());
}

#[tokio::test]
async fn test_background_worker_drains_queue() {
    let mut config = AssessmentConfig::default();
    config.messaging.poll_interval_ms = 20;
    let system = build_system_with(config).await;
    let coordinator = AssessmentCoordinator::new(system.context.clone());

    let worker = system.context.diagnosis_worker();
    let handle = worker.start().expect("worker starts once");
    assert!(worker.start().is_none());

    for id in 1..=3 {
        coordinator.assess(&format!("patient-{id}"), request(id)).await;
    }

    let coordinator_ref = &coordinator;
    let done = common::eventually(Duration::from_secs(5), move || async move {
        let mut ready = 0;
        for id in 1..=3 {
            if coordinator_ref
                .diagnosis_status(&id.to_string()).await.parsed_status()
                == Some(DiagnosisStatus::Ready)
            {
                ready += 1;
            }
        }
        ready == 3
    })
    .await;
    assert!(done, "all diagnoses should complete");

    worker.stop();
    handle.await.unwrap();
    assert!(!worker.is_running());
}
