//! Shared fakes and builders for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use assessment_core::clients::{ClientError, ClientResult, ReasoningEngine, RiskScoringEngine};
use assessment_core::config::AssessmentConfig;
use assessment_core::models::{
    DiagnosisRequest, DiagnosisResponse, RiskScoreResult, VitalsSnapshot,
};
use assessment_core::{ConfigManager, SystemContext};

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Scoring engine returning a fixed result until told to fail
#[derive(Debug, Default)]
pub struct FakeScoringEngine {
    pub calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeScoringEngine {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RiskScoringEngine for FakeScoringEngine {
    async fn predict(&self, _vitals: &VitalsSnapshot) -> ClientResult<RiskScoreResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::api_error(503, "scoring engine down"));
        }
        Ok(RiskScoreResult {
            heart_risk: 0.42,
            diabetes_risk: 0.18,
            stroke_risk: 0.11,
            kidney_risk: 0.05,
            general_health_score: 0.71,
            confidence: 0.92,
            model_precisions: Default::default(),
        })
    }

    fn name(&self) -> &'static str {
        "fake_scoring"
    }
}

/// Reasoning engine that echoes the assessment id back
#[derive(Debug, Default)]
pub struct FakeReasoningEngine {
    pub calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeReasoningEngine {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningEngine for FakeReasoningEngine {
    async fn diagnose(&self, request: &DiagnosisRequest) -> ClientResult<DiagnosisResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::api_error(500, "reasoning engine down"));
        }
        Ok(DiagnosisResponse {
            diagnosis: format!("Assessment {}: monitor blood pressure", request.assessment_id),
            status: "completed".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "fake_reasoning"
    }
}

pub struct TestSystem {
    pub context: Arc<SystemContext>,
    pub scoring: Arc<FakeScoringEngine>,
    pub reasoning: Arc<FakeReasoningEngine>,
}

/// In-process system: moka cache, in-memory queue and ledger
pub async fn build_system() -> TestSystem {
    build_system_with(AssessmentConfig::default()).await
}

pub async fn build_system_with(config: AssessmentConfig) -> TestSystem {
    init_test_logging();
    let manager = Arc::new(ConfigManager::from_config(config, "test").expect("valid config"));
    let scoring = Arc::new(FakeScoringEngine::default());
    let reasoning = Arc::new(FakeReasoningEngine::default());

    let context = SystemContext::with_engines(
        manager,
        Arc::clone(&scoring) as Arc<dyn RiskScoringEngine>,
        Arc::clone(&reasoning) as Arc<dyn ReasoningEngine>,
    )
    .await
    .expect("system context");

    TestSystem {
        context: Arc::new(context),
        scoring,
        reasoning,
    }
}

pub fn sample_vitals() -> VitalsSnapshot {
    VitalsSnapshot {
        age: 58,
        gender: "female".to_string(),
        systolic_bp: 148,
        diastolic_bp: 92,
        glucose: 130,
        bmi: 29.4,
        cholesterol: 230,
        smoking: "former".to_string(),
        medications: "Metformin 500mg, Lisinopril".to_string(),
        ..Default::default()
    }
}

/// Poll `check` until it holds or the deadline passes
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
