//! Risk-scoring results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Model names reported in the precision map
pub const MODEL_NAMES: [&str; 4] = ["Heart_Model", "Diabetes_Model", "Stroke_Model", "Kidney_Model"];

/// Per-condition probabilities from the scoring engine or the heuristic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskScoreResult {
    #[serde(rename = "heart_risk_score")]
    pub heart_risk: f64,
    #[serde(rename = "diabetes_risk_score")]
    pub diabetes_risk: f64,
    #[serde(rename = "stroke_risk_score")]
    pub stroke_risk: f64,
    #[serde(rename = "kidney_risk_score")]
    pub kidney_risk: f64,
    pub general_health_score: f64,
    #[serde(rename = "clinical_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub model_precisions: HashMap<String, f64>,
}

/// Where a risk score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSource {
    Cache,
    Engine,
    Heuristic,
}

/// Gateway answer: the score plus whether it is a degraded estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub result: RiskScoreResult,
    pub confidence_downgraded: bool,
    pub source: RiskSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_wire_names() {
        let json = r#"{
            "heart_risk_score": 0.2,
            "diabetes_risk_score": 0.3,
            "stroke_risk_score": 0.1,
            "kidney_risk_score": 0.05,
            "general_health_score": 0.8,
            "clinical_confidence": 0.93
        }"#;
        let result: RiskScoreResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.heart_risk, 0.2);
        assert_eq!(result.confidence, 0.93);
        assert!(result.model_precisions.is_empty());
    }
}
