//! Diagnosis requests and their lifecycle status.

use serde::{Deserialize, Serialize};

use super::{RiskScoreResult, VitalsSnapshot};

/// Text shown when the reasoning engine could not be reached
pub const REASONING_SERVICE_ERROR: &str = "Diagnosis unavailable - reasoning service error";
/// Text shown when the reasoning engine's reply could not be read
pub const REASONING_DECODE_ERROR: &str = "Diagnosis unavailable - decode error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisStatus {
    Pending,
    Ready,
    Error,
}

impl DiagnosisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for DiagnosisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiagnosisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown diagnosis status '{other}'")),
        }
    }
}

/// Input to the reasoning engine; also the queue message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub assessment_id: i64,
    #[serde(rename = "patient")]
    pub vitals: VitalsSnapshot,
    pub risk_scores: RiskScoreResult,
    /// Free-text history, e.g. earlier clinician feedback
    #[serde(default)]
    pub past_context: String,
}

/// Reasoning engine reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisResponse {
    pub diagnosis: String,
    pub status: String,
}

/// Stored status record; `status` is empty for unknown ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisSnapshot {
    pub text: String,
    pub status: String,
}

impl DiagnosisSnapshot {
    pub fn new(text: impl Into<String>, status: DiagnosisStatus) -> Self {
        Self {
            text: text.into(),
            status: status.as_str().to_string(),
        }
    }

    pub fn parsed_status(&self) -> Option<DiagnosisStatus> {
        self.status.parse().ok()
    }

    pub fn is_unknown(&self) -> bool {
        self.status.is_empty()
    }
}

/// Event published on every status write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub subject_id: String,
    pub text: String,
    pub status: DiagnosisStatus,
}
