//! Runs one diagnosis against the reasoning engine and records the outcome.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use super::DiagnosisStatusStore;
use crate::clients::ReasoningEngine;
use crate::models::{DiagnosisRequest, DiagnosisStatus, REASONING_DECODE_ERROR, REASONING_SERVICE_ERROR};

/// Call the engine once and write the terminal status; no retries
pub async fn execute_diagnosis(
    engine: &Arc<dyn ReasoningEngine>,
    store: &DiagnosisStatusStore,
    request: &DiagnosisRequest,
) -> DiagnosisStatus {
    let subject_id = request.assessment_id.to_string();
    let started = Instant::now();

    let (text, status) = match engine.diagnose(request).await {
        Ok(response) => {
            info!(
                subject_id = %subject_id,
                duration_ms = started.elapsed().as_millis() as u64,
                "✅ Diagnosis completed"
            );
            (response.diagnosis, DiagnosisStatus::Ready)
        }
        Err(e) => {
            error!(subject_id = %subject_id, error = %e, "Diagnosis failed");
            let text = if e.is_decode_error() {
                REASONING_DECODE_ERROR
            } else {
                REASONING_SERVICE_ERROR
            };
            (text.to_string(), DiagnosisStatus::Error)
        }
    };

    store.set(&subject_id, &text, status).await;
    status
}
