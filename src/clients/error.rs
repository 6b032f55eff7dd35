//! # Client Error Types

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Failures talking to the scoring or reasoning engine
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ClientError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// The engine answered but the body could not be understood
    pub fn is_decode_error(&self) -> bool {
        match self {
            Self::InvalidResponse { .. } => true,
            Self::HttpError(e) => e.is_decode(),
            _ => false,
        }
    }
}
