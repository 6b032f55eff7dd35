//! # Assessment Coordinator
//!
//! Per-request sequence: risk scores (synchronous, never failing), an
//! `AI_PREDICTION` audit entry, then an asynchronous diagnosis. The caller
//! gets scores and a `pending` diagnosis back without waiting on the
//! reasoning engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{AssessmentError, AssessmentResult};
use crate::gateway::{check_medications, InteractionResult};
use crate::ledger::{AuditEntry, AuditEventType, AuditLedger, BackupReceipt, VerifyReport};
use crate::logging::log_error;
use crate::models::{
    DiagnosisRequest, DiagnosisSnapshot, DiagnosisStatus, RiskScoreResult, RiskSource, VitalsSnapshot,
};
use crate::system_context::SystemContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    /// Key for the diagnosis status and viewer subscriptions
    pub assessment_id: i64,
    pub vitals: VitalsSnapshot,
    #[serde(default)]
    pub past_context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentOutcome {
    pub assessment_id: i64,
    pub risk: RiskScoreResult,
    pub confidence_downgraded: bool,
    pub risk_source: RiskSource,
    pub medications: InteractionResult,
    pub diagnosis: DiagnosisSnapshot,
    /// Hash of the audit entry, when the ledger is enabled and the append succeeded
    pub audit_hash: Option<String>,
    pub diagnosis_direct: bool,
}

/// Clinician review of an assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorFeedback {
    pub assessment_id: i64,
    pub approved: bool,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct AssessmentCoordinator {
    context: Arc<SystemContext>,
}

impl AssessmentCoordinator {
    pub fn new(context: Arc<SystemContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<SystemContext> {
        &self.context
    }

    /// Score, audit and dispatch one assessment
    pub async fn assess(&self, subject_id: &str, request: AssessmentRequest) -> AssessmentOutcome {
        let risk = self
            .context
            .gateway
            .get_risk_scores(subject_id, &request.vitals)
            .await;

        let audit_hash = self
            .audit(
                AuditEventType::AiPrediction,
                subject_id,
                &serde_json::json!({
                    "assessment_id": request.assessment_id,
                    "risk": &risk.result,
                    "source": risk.source,
                }),
            )
            .await
            .map(|entry| entry.current_hash);

        let route = self
            .context
            .dispatcher
            .start_async(DiagnosisRequest {
                assessment_id: request.assessment_id,
                vitals: request.vitals.clone(),
                risk_scores: risk.result.clone(),
                past_context: request.past_context,
            })
            .await;

        info!(
            subject_id = %subject_id,
            assessment_id = request.assessment_id,
            risk_source = ?risk.source,
            downgraded = risk.confidence_downgraded,
            direct = route.is_direct(),
            "🩺 Assessment accepted"
        );

        AssessmentOutcome {
            assessment_id: request.assessment_id,
            medications: check_medications(&request.vitals.medications),
            risk: risk.result,
            confidence_downgraded: risk.confidence_downgraded,
            risk_source: risk.source,
            diagnosis: DiagnosisSnapshot::new("", DiagnosisStatus::Pending),
            audit_hash,
            diagnosis_direct: route.is_direct(),
        }
    }

    pub async fn diagnosis_status(&self, assessment_id: &str) -> DiagnosisSnapshot {
        self.context.status_store.get(assessment_id).await
    }

    /// Record a clinician's review in the ledger
    pub async fn record_feedback(
        &self,
        subject_id: &str,
        feedback: &DoctorFeedback,
        actor_id: &str,
    ) -> AssessmentResult<AuditEntry> {
        let ledger = self.ledger()?;
        Ok(ledger
            .append(&AuditEventType::DoctorFeedback, subject_id, feedback, actor_id)
            .await?)
    }

    pub async fn verify_ledger(&self) -> AssessmentResult<VerifyReport> {
        Ok(self.ledger()?.verify().await?)
    }

    pub async fn export_ledger(&self) -> AssessmentResult<Vec<u8>> {
        Ok(self.ledger()?.export().await?)
    }

    pub async fn backup_ledger(&self) -> AssessmentResult<BackupReceipt> {
        Ok(self
            .ledger()?
            .backup(self.context.content_store.as_ref())
            .await?)
    }

    fn ledger(&self) -> AssessmentResult<&Arc<AuditLedger>> {
        self.context
            .ledger
            .as_ref()
            .ok_or_else(|| AssessmentError::LedgerError("audit ledger is disabled".to_string()))
    }

    /// Append as the system actor; failures are logged, never surfaced
    async fn audit(
        &self,
        event_type: AuditEventType,
        subject_id: &str,
        payload: &serde_json::Value,
    ) -> Option<AuditEntry> {
        let ledger = self.context.ledger.as_ref()?;
        let actor = &self.context.config_manager.config().ledger.system_actor;
        match ledger.append(&event_type, subject_id, payload, actor).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                log_error("coordinator", "audit", &e.to_string(), Some(event_type.as_str()));
                None
            }
        }
    }
}
