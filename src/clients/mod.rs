//! # Engine Clients
//!
//! Contracts for the two external analysis engines and their HTTP
//! implementations. Everything upstream of these traits is engine-agnostic,
//! so tests substitute in-process fakes.

pub mod error;
pub mod reasoning;
pub mod scoring;

use async_trait::async_trait;

use crate::models::{DiagnosisRequest, DiagnosisResponse, RiskScoreResult, VitalsSnapshot};

pub use error::{ClientError, ClientResult};
pub use reasoning::HttpReasoningEngine;
pub use scoring::HttpRiskScoringEngine;

/// External risk-scoring engine
#[async_trait]
pub trait RiskScoringEngine: Send + Sync + 'static {
    async fn predict(&self, vitals: &VitalsSnapshot) -> ClientResult<RiskScoreResult>;

    fn name(&self) -> &'static str;
}

/// External reasoning / explanation engine
#[async_trait]
pub trait ReasoningEngine: Send + Sync + 'static {
    async fn diagnose(&self, request: &DiagnosisRequest) -> ClientResult<DiagnosisResponse>;

    fn name(&self) -> &'static str;
}

/// Build an HTTP client with the given timeout
pub(crate) fn build_http_client(timeout: std::time::Duration) -> ClientResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(format!("assessment-core/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::config_error(format!("Failed to create HTTP client: {e}")))
}

/// Append `path` to `base_url`, keeping any path prefix the base carries
pub(crate) fn endpoint(base_url: &str, path: &str) -> ClientResult<reqwest::Url> {
    let mut base = reqwest::Url::parse(base_url)
        .map_err(|e| ClientError::config_error(format!("Invalid base URL '{base_url}': {e}")))?;
    if !base.path().ends_with('/') {
        let prefix = format!("{}/", base.path());
        base.set_path(&prefix);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ClientError::config_error(format!("Invalid endpoint '{path}': {e}")))
}

/// Turn a non-2xx response into an `ApiError`
pub(crate) async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ClientError::api_error(status.as_u16(), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let url = endpoint("http://ml:8000", "/predict").unwrap();
        assert_eq!(url.as_str(), "http://ml:8000/predict");
        let url = endpoint("http://ml:8000/", "/diagnose").unwrap();
        assert_eq!(url.as_str(), "http://ml:8000/diagnose");
        assert!(matches!(
            endpoint("not a url", "/predict"),
            Err(ClientError::ConfigError(_))
        ));
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let url = endpoint("http://gateway:8000/ml", "/predict").unwrap();
        assert_eq!(url.as_str(), "http://gateway:8000/ml/predict");

        let url = endpoint("http://gateway:8000/ml/v1/", "diagnose").unwrap();
        assert_eq!(url.as_str(), "http://gateway:8000/ml/v1/diagnose");
    }

    #[test]
    fn test_decode_classification() {
        assert!(ClientError::invalid_response("reasoning", "missing field").is_decode_error());
        assert!(!ClientError::api_error(503, "busy").is_decode_error());
    }
}
