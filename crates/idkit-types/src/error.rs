//! Failure taxonomy shared by every API-facing operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by every async operation in the SDK.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure envelope returned by API calls and pending operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Structured error from the backend, carries machine-readable codes.
    #[error("API error: {0}")]
    Api(ApiErrorResponse),

    /// Non-2xx response whose body could not be parsed as a structured error.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Local exception, malformed backend response, or contract violation.
    #[error("Unknown error: {0}")]
    Unknown(String),

    /// The pending operation was superseded or cancelled by the caller.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl ApiError {
    /// Wrap any displayable error as an [`ApiError::Unknown`].
    pub fn unknown(err: impl std::fmt::Display) -> Self {
        Self::Unknown(err.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Structured error body returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub errors: Vec<ApiErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors.first() {
            Some(detail) => write!(f, "{} ({})", detail.message, detail.code),
            None => write!(f, "no error details"),
        }
    }
}

/// A single machine-readable error entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_message: Option<String>,
}
