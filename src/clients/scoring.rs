//! HTTP client for the risk-scoring engine (`POST /predict`).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::{build_http_client, check_status, endpoint, ClientError, ClientResult, RiskScoringEngine};
use crate::config::ScoringConfig;
use crate::logging::log_upstream_call;
use crate::models::{RiskScoreResult, VitalsSnapshot};

#[derive(Debug, Clone)]
pub struct HttpRiskScoringEngine {
    client: reqwest::Client,
    predict_url: reqwest::Url,
    timeout: Duration,
}

impl HttpRiskScoringEngine {
    pub fn new(config: &ScoringConfig) -> ClientResult<Self> {
        let predict_url = endpoint(&config.base_url, "/predict")?;
        let client = build_http_client(config.timeout())?;
        debug!(url = %predict_url, timeout_ms = config.timeout_ms, "Created scoring engine client");
        Ok(Self {
            client,
            predict_url,
            timeout: config.timeout(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl RiskScoringEngine for HttpRiskScoringEngine {
    async fn predict(&self, vitals: &VitalsSnapshot) -> ClientResult<RiskScoreResult> {
        let started = Instant::now();
        let outcome = async {
            let response = self
                .client
                .post(self.predict_url.clone())
                .json(vitals)
                .send()
                .await?;
            let response = check_status(response).await?;
            let body = response.bytes().await?;
            serde_json::from_slice::<RiskScoreResult>(&body)
                .map_err(|e| ClientError::invalid_response(self.name(), e.to_string()))
        }
        .await;

        log_upstream_call(
            self.name(),
            None,
            if outcome.is_ok() { "ok" } else { "failed" },
            Some(started.elapsed().as_millis() as u64),
            outcome.as_ref().err().map(|e| e.to_string()).as_deref(),
        );
        outcome
    }

    fn name(&self) -> &'static str {
        "scoring_engine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config(base_url: String) -> ScoringConfig {
        ScoringConfig {
            base_url,
            timeout_ms: 2000,
            ..ScoringConfig::default()
        }
    }

    #[tokio::test]
    async fn test_predict_parses_engine_reply() {
        let router = Router::new().route(
            "/predict",
            post(|Json(vitals): Json<VitalsSnapshot>| async move {
                Json(serde_json::json!({
                    "heart_risk_score": if vitals.systolic_bp > 150 { 0.7 } else { 0.1 },
                    "diabetes_risk_score": 0.2,
                    "stroke_risk_score": 0.1,
                    "kidney_risk_score": 0.05,
                    "general_health_score": 0.8,
                    "clinical_confidence": 0.92,
                    "model_precisions": {"Heart_Model": 0.88}
                }))
            }),
        );
        let engine = HttpRiskScoringEngine::new(&config(serve(router).await)).unwrap();

        let vitals = VitalsSnapshot {
            systolic_bp: 170,
            ..Default::default()
        };
        let result = engine.predict(&vitals).await.unwrap();
        assert_eq!(result.heart_risk, 0.7);
        assert_eq!(result.model_precisions.get("Heart_Model"), Some(&0.88));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let router = Router::new().route(
            "/predict",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model loading") }),
        );
        let engine = HttpRiskScoringEngine::new(&config(serve(router).await)).unwrap();

        let err = engine.predict(&VitalsSnapshot::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::ApiError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_garbage_body_is_a_decode_error() {
        let router = Router::new().route("/predict", post(|| async { "not json" }));
        let engine = HttpRiskScoringEngine::new(&config(serve(router).await)).unwrap();

        let err = engine.predict(&VitalsSnapshot::default()).await.unwrap_err();
        assert!(err.is_decode_error());
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_a_transport_error() {
        let engine = HttpRiskScoringEngine::new(&config("http://127.0.0.1:1".to_string())).unwrap();
        let err = engine.predict(&VitalsSnapshot::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::HttpError(_)));
    }
}
