//! # Ledger Errors

use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Audit storage error: {0}")]
    Storage(String),

    #[error("Audit serialization error: {0}")]
    Serialization(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Backup encryption error: {0}")]
    Encryption(String),

    #[error("Content store error: {0}")]
    ContentStore(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(error: sqlx::Error) -> Self {
        LedgerError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::Serialization(error.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::ContentStore(error.to_string())
    }
}
