//! HTTP client for the reasoning engine (`POST /diagnose`).

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use super::{build_http_client, check_status, endpoint, ClientError, ClientResult, ReasoningEngine};
use crate::config::ReasoningConfig;
use crate::logging::log_upstream_call;
use crate::models::{DiagnosisRequest, DiagnosisResponse};

#[derive(Debug, Clone)]
pub struct HttpReasoningEngine {
    client: reqwest::Client,
    diagnose_url: reqwest::Url,
}

impl HttpReasoningEngine {
    pub fn new(config: &ReasoningConfig) -> ClientResult<Self> {
        let diagnose_url = endpoint(&config.base_url, "/diagnose")?;
        let client = build_http_client(config.timeout())?;
        debug!(url = %diagnose_url, timeout_ms = config.timeout_ms, "Created reasoning engine client");
        Ok(Self {
            client,
            diagnose_url,
        })
    }
}

#[async_trait]
impl ReasoningEngine for HttpReasoningEngine {
    async fn diagnose(&self, request: &DiagnosisRequest) -> ClientResult<DiagnosisResponse> {
        let started = Instant::now();
        let subject = request.assessment_id.to_string();
        let outcome = async {
            let response = self
                .client
                .post(self.diagnose_url.clone())
                .json(request)
                .send()
                .await?;
            let response = check_status(response).await?;
            let body = response.bytes().await?;
            serde_json::from_slice::<DiagnosisResponse>(&body)
                .map_err(|e| ClientError::invalid_response(self.name(), e.to_string()))
        }
        .await;

        log_upstream_call(
            self.name(),
            Some(&subject),
            if outcome.is_ok() { "ok" } else { "failed" },
            Some(started.elapsed().as_millis() as u64),
            outcome.as_ref().err().map(|e| e.to_string()).as_deref(),
        );
        outcome
    }

    fn name(&self) -> &'static str {
        "reasoning_engine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RiskScoreResult, VitalsSnapshot};
    use axum::{routing::post, Json, Router};

    fn request() -> DiagnosisRequest {
        DiagnosisRequest {
            assessment_id: 11,
            vitals: VitalsSnapshot::default(),
            risk_scores: RiskScoreResult::default(),
            past_context: "prior: hypertension".to_string(),
        }
    }

    #[tokio::test]
    async fn test_diagnose_round_trip() {
        let router = Router::new().route(
            "/diagnose",
            post(|Json(req): Json<DiagnosisRequest>| async move {
                Json(serde_json::json!({
                    "diagnosis": format!("Reviewed assessment {}", req.assessment_id),
                    "status": "success"
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let engine = HttpReasoningEngine::new(&ReasoningConfig {
            base_url: format!("http://{addr}"),
            timeout_ms: 2000,
        })
        .unwrap();

        let response = engine.diagnose(&request()).await.unwrap();
        assert_eq!(response.diagnosis, "Reviewed assessment 11");
    }

    #[tokio::test]
    async fn test_unreachable_is_not_a_decode_error() {
        let engine = HttpReasoningEngine::new(&ReasoningConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 500,
        })
        .unwrap();
        let err = engine.diagnose(&request()).await.unwrap_err();
        assert!(!err.is_decode_error());
    }
}
