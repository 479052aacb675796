//! Error types for CiteNet
//!
//! Provides a compact error taxonomy with:
//! - Record-level errors that skip one input (malformed records, failed fetches)
//! - Fatal configuration errors raised before any work starts
//! - Machine-readable error codes for the tool-response layer

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors (1xxx)
    MalformedRecord,

    // Configuration errors (2xxx)
    InvalidConfiguration,
    ConfigurationError,

    // Resource errors (4xxx)
    NotFound,

    // External collaborator errors (8xxx)
    FetchFailure,

    // Internal errors (9xxx)
    InternalError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::MalformedRecord => 1001,

            ErrorCode::InvalidConfiguration => 2001,
            ErrorCode::ConfigurationError => 2002,

            ErrorCode::NotFound => 4001,

            ErrorCode::FetchFailure => 8001,

            ErrorCode::InternalError => 9001,
            ErrorCode::SerializationError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// A raw record that cannot be turned into a paper
    #[error("Malformed {source_tag} record: {reason}")]
    MalformedRecord { source_tag: String, reason: String },

    /// A single fetch against an external collaborator failed
    #[error("Fetch failed for {id}: {message}")]
    FetchFailure { id: String, message: String },

    #[error("Paper not found: {id}")]
    NotFound { id: String },

    /// Rejected options, raised before any fetch begins
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
        field: Option<String>,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for an invalid option on a named field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::InvalidConfiguration {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::MalformedRecord { .. } => ErrorCode::MalformedRecord,
            AppError::FetchFailure { .. } => ErrorCode::FetchFailure,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::InvalidConfiguration { .. } => ErrorCode::InvalidConfiguration,
            AppError::Configuration(_) => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Fatal errors abort the whole operation; the rest only skip one node
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::MalformedRecord { .. }
            | AppError::FetchFailure { .. }
            | AppError::NotFound { .. } => false,

            AppError::InvalidConfiguration { .. }
            | AppError::Configuration(_)
            | AppError::Serialization(_)
            | AppError::Internal { .. }
            | AppError::Other(_) => true,
        }
    }

    /// Build the structured payload handed to the tool-response layer
    pub fn to_response(&self) -> ErrorResponse {
        let code = self.code();
        let message = self.to_string();

        if self.is_fatal() {
            tracing::error!(error = %message, code = ?code, "Fatal error");
        } else {
            tracing::warn!(error = %message, code = ?code, "Recoverable error");
        }

        let details = match self {
            AppError::InvalidConfiguration {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };

        ErrorResponse {
            error: ErrorDetails {
                code,
                numeric_code: code.as_code(),
                message,
                details,
            },
        }
    }
}

/// Structured error response for the tool layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::InvalidConfiguration {
            message: err.to_string(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::NotFound { id: "doi:10.1/x".into() };
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.code().as_code(), 4001);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_invalid_configuration_is_fatal() {
        let err = AppError::invalid_field("max_depth", "must be at least 1");
        assert_eq!(err.code(), ErrorCode::InvalidConfiguration);
        assert!(err.is_fatal());

        let response = err.to_response();
        assert_eq!(response.error.numeric_code, 2001);
        assert_eq!(
            response.error.details,
            Some(serde_json::json!({ "field": "max_depth" }))
        );
    }

    #[test]
    fn test_record_errors_are_recoverable() {
        let malformed = AppError::MalformedRecord {
            source_tag: "crossref".into(),
            reason: "no title or identifier".into(),
        };
        let fetch = AppError::FetchFailure {
            id: "s2:abc".into(),
            message: "timeout".into(),
        };
        assert!(!malformed.is_fatal());
        assert!(!fetch.is_fatal());
        assert!(malformed.to_string().contains("crossref"));
    }
}
