//! Vitals snapshot submitted with an assessment, and its cache fingerprint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Clinical measurements for one assessment request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsSnapshot {
    pub age: u32,
    pub gender: String,
    pub systolic_bp: u32,
    pub diastolic_bp: u32,
    pub glucose: u32,
    pub bmi: f64,
    pub cholesterol: u32,
    pub heart_rate: u32,
    pub steps: u32,
    pub smoking: String,
    pub alcohol: String,
    /// Comma-separated medication list as entered
    pub medications: String,
    #[serde(default)]
    pub history: HistoryFlags,
}

/// Prior-condition flags forwarded to the scoring engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryFlags {
    pub family_heart_disease: bool,
    pub prior_stroke: bool,
    pub diabetes_diagnosed: bool,
}

impl VitalsSnapshot {
    /// Digest of the fields that determine a risk score
    pub fn fingerprint(&self) -> VitalsFingerprint {
        VitalsFingerprint::compute(self)
    }
}

/// Hex SHA-256 over age, systolic BP, glucose, BMI, cholesterol and smoking
///
/// Each field is written as an 8-byte big-endian length followed by its
/// text form, so no two distinct inputs share a preimage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VitalsFingerprint(String);

impl VitalsFingerprint {
    pub fn compute(vitals: &VitalsSnapshot) -> Self {
        let fields = [
            vitals.age.to_string(),
            vitals.systolic_bp.to_string(),
            vitals.glucose.to_string(),
            vitals.bmi.to_string(),
            vitals.cholesterol.to_string(),
            vitals.smoking.clone(),
        ];

        let mut hasher = Sha256::new();
        for field in &fields {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VitalsFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
