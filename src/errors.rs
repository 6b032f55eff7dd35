//! Error types for the assessment core.
//!
//! Subsystems keep their own error enums (`CacheError`, `MessagingError`,
//! `LedgerError`, ...) and convert into [`AssessmentError`] at the crate
//! boundary.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssessmentError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Cache error: {0}")]
    CacheError(String),
    #[error("Messaging error: {0}")]
    MessagingError(String),
    #[error("Upstream service error: {0}")]
    UpstreamError(String),
    #[error("Ledger error: {0}")]
    LedgerError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Crypto error: {0}")]
    CryptoError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AssessmentError {
    fn from(error: serde_json::Error) -> Self {
        AssessmentError::SerializationError(format!("JSON serialization error: {error}"))
    }
}

impl From<sqlx::Error> for AssessmentError {
    fn from(err: sqlx::Error) -> Self {
        AssessmentError::StorageError(err.to_string())
    }
}

impl From<crate::cache::CacheError> for AssessmentError {
    fn from(error: crate::cache::CacheError) -> Self {
        AssessmentError::CacheError(error.to_string())
    }
}

impl From<crate::messaging::MessagingError> for AssessmentError {
    fn from(error: crate::messaging::MessagingError) -> Self {
        AssessmentError::MessagingError(error.to_string())
    }
}

impl From<crate::ledger::LedgerError> for AssessmentError {
    fn from(error: crate::ledger::LedgerError) -> Self {
        use crate::ledger::LedgerError;
        match error {
            LedgerError::Signature(_) | LedgerError::Encryption(_) => {
                AssessmentError::CryptoError(error.to_string())
            }
            other => AssessmentError::LedgerError(other.to_string()),
        }
    }
}

impl From<crate::config::ConfigurationError> for AssessmentError {
    fn from(error: crate::config::ConfigurationError) -> Self {
        AssessmentError::ConfigurationError(error.to_string())
    }
}

impl From<crate::clients::ClientError> for AssessmentError {
    fn from(error: crate::clients::ClientError) -> Self {
        AssessmentError::UpstreamError(error.to_string())
    }
}

pub type AssessmentResult<T> = Result<T, AssessmentError>;
