//! Rule-based risk estimate used when the scoring engine is unavailable.

use std::collections::HashMap;

use crate::models::{RiskScoreResult, VitalsSnapshot, MODEL_NAMES};

/// Confidence reported for every heuristic estimate
pub const HEURISTIC_CONFIDENCE: f64 = 0.5;

pub fn heart_risk(vitals: &VitalsSnapshot) -> f64 {
    if vitals.systolic_bp > 160 || vitals.cholesterol > 240 {
        0.85
    } else if vitals.systolic_bp > 140 || vitals.cholesterol > 200 {
        0.45
    } else {
        0.15
    }
}

pub fn diabetes_risk(vitals: &VitalsSnapshot) -> f64 {
    if vitals.glucose > 200 || vitals.bmi > 35.0 {
        0.90
    } else if vitals.glucose > 125 || vitals.bmi > 30.0 {
        0.50
    } else {
        0.10
    }
}

pub fn stroke_risk(vitals: &VitalsSnapshot) -> f64 {
    if vitals.age > 65 && vitals.systolic_bp > 160 {
        0.75
    } else if vitals.age > 50 && vitals.systolic_bp > 140 {
        0.35
    } else {
        0.05
    }
}

/// Deterministic estimate; never fails
pub fn estimate(vitals: &VitalsSnapshot) -> RiskScoreResult {
    let heart = heart_risk(vitals);
    let diabetes = diabetes_risk(vitals);
    let stroke = stroke_risk(vitals);

    RiskScoreResult {
        heart_risk: heart,
        diabetes_risk: diabetes,
        stroke_risk: stroke,
        // No rule for kidney risk
        kidney_risk: 0.0,
        general_health_score: 1.0 - (heart + diabetes + stroke) / 3.0,
        confidence: HEURISTIC_CONFIDENCE,
        model_precisions: MODEL_NAMES
            .iter()
            .map(|name| (name.to_string(), 0.0))
            .collect::<HashMap<_, _>>(),
    }
}
