//! Status updates crossing instances through a shared relay

mod common;

use std::sync::Arc;
use std::time::Duration;

use assessment_core::config::AssessmentConfig;
use assessment_core::diagnosis::StatusRelay;
use assessment_core::models::DiagnosisStatus;
use assessment_core::notifier::{ChannelSink, ServerMessage, ViewerSink};
use assessment_core::{AssessmentCoordinator, AssessmentRequest, ConfigManager, SystemContext};
use tokio::sync::mpsc;
use uuid::Uuid;

use common::{init_test_logging, sample_vitals, FakeReasoningEngine, FakeScoringEngine};

async fn instance(relay: &StatusRelay) -> Arc<SystemContext> {
    init_test_logging();
    let manager = Arc::new(ConfigManager::from_config(AssessmentConfig::default(), "test").unwrap());
    let context = SystemContext::with_engines_and_relay(
        manager,
        Arc::new(FakeScoringEngine::default()),
        Arc::new(FakeReasoningEngine::default()),
        Some(relay.clone()),
    )
    .await
    .unwrap();
    let context = Arc::new(context);
    context.start_notification_listener().unwrap();
    context.start_status_relay().unwrap();
    context
}

async fn watch(context: &SystemContext, subject_id: &str) -> mpsc::Receiver<ServerMessage> {
    let (tx, rx) = mpsc::channel(16);
    let sink: Arc<dyn ViewerSink> = Arc::new(ChannelSink::new(tx));
    context
        .subscriptions
        .subscribe(subject_id, Uuid::new_v4(), sink)
        .await;
    rx
}

async fn next(rx: &mut mpsc::Receiver<ServerMessage>) -> Option<ServerMessage> {
    tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .ok()
        .flatten()
}

#[tokio::test]
async fn test_write_on_one_instance_reaches_viewer_on_another() {
    let relay = StatusRelay::in_memory(64);
    let instance_a = instance(&relay).await;
    let instance_b = instance(&relay).await;
    let mut viewer = watch(&instance_a, "42").await;

    instance_b
        .status_store
        .set("42", "Stage 1 hypertension", DiagnosisStatus::Ready)
        .await;

    let update = next(&mut viewer).await.expect("relayed update");
    assert_eq!(
        update,
        ServerMessage::StatusUpdate {
            subject_id: "42".to_string(),
            text: "Stage 1 hypertension".to_string(),
            status: DiagnosisStatus::Ready,
        }
    );
    assert!(next(&mut viewer).await.is_none());
}

#[tokio::test]
async fn test_local_write_is_delivered_once() {
    let relay = StatusRelay::in_memory(64);
    let instance_a = instance(&relay).await;
    let _instance_b = instance(&relay).await;
    let mut viewer = watch(&instance_a, "8").await;

    instance_a
        .status_store
        .set("8", "", DiagnosisStatus::Pending)
        .await;

    assert!(next(&mut viewer).await.is_some());
    assert!(next(&mut viewer).await.is_none());
}

#[tokio::test]
async fn test_worker_on_peer_completes_viewed_assessment() {
    let relay = StatusRelay::in_memory(64);
    let instance_a = instance(&relay).await;
    let instance_b = instance(&relay).await;
    let mut viewer = watch(&instance_a, "300").await;

    // Instance B accepts the assessment and its worker runs the diagnosis
    let coordinator = AssessmentCoordinator::new(Arc::clone(&instance_b));
    let outcome = coordinator
        .assess(
            "patient-300",
            AssessmentRequest {
                assessment_id: 300,
                vitals: sample_vitals(),
                past_context: String::new(),
            },
        )
        .await;
    assert!(!outcome.diagnosis_direct);
    instance_b.diagnosis_worker().poll_now().await.unwrap();

    let mut statuses = Vec::new();
    while let Some(ServerMessage::StatusUpdate { status, .. }) = next(&mut viewer).await {
        statuses.push(status);
    }
    assert_eq!(statuses, vec![DiagnosisStatus::Pending, DiagnosisStatus::Ready]);
}
