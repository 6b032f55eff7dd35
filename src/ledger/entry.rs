//! Audit entries and event types.

use serde::{Deserialize, Serialize};

/// Kind of clinically significant event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuditEventType {
    AiPrediction,
    DoctorFeedback,
    PatientCreated,
    Custom(String),
}

impl AuditEventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AiPrediction => "AI_PREDICTION",
            Self::DoctorFeedback => "DOCTOR_FEEDBACK",
            Self::PatientCreated => "PATIENT_CREATED",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for AuditEventType {
    fn from(value: &str) -> Self {
        match value {
            "AI_PREDICTION" => Self::AiPrediction,
            "DOCTOR_FEEDBACK" => Self::DoctorFeedback,
            "PATIENT_CREATED" => Self::PatientCreated,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable link of the audit chain
///
/// `timestamp` is kept as the exact RFC 3339 text that was hashed so the
/// hash can be recomputed byte-for-byte after a round trip through storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub timestamp: String,
    pub event_type: String,
    pub subject_hash: String,
    pub payload_hash: String,
    pub prev_hash: String,
    pub current_hash: String,
    pub actor_id: String,
    /// Hex Ed25519 signature over (payload_hash, timestamp)
    pub actor_signature: String,
    /// Hex Ed25519 public key of the signer
    pub actor_public_key: String,
}

impl AuditEntry {
    /// Hash recomputed from the stored fields
    pub fn recompute_hash(&self) -> String {
        super::hashing::entry_hash(
            &self.timestamp,
            &self.event_type,
            &self.subject_hash,
            &self.payload_hash,
            &self.prev_hash,
            &self.actor_id,
        )
    }
}
