//! Domain types shared across components.

pub mod diagnosis;
pub mod risk;
pub mod vitals;

pub use diagnosis::{
    DiagnosisRequest, DiagnosisResponse, DiagnosisSnapshot, DiagnosisStatus, StatusChanged,
    REASONING_DECODE_ERROR, REASONING_SERVICE_ERROR,
};
pub use risk::{RiskAssessment, RiskScoreResult, RiskSource, MODEL_NAMES};
pub use vitals::{HistoryFlags, VitalsFingerprint, VitalsSnapshot};
