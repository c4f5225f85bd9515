/// Unified error types for hxprezi
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for manifest resolution
///
/// Every variant maps to exactly one HTTP status; the display string is the
/// `error_message` of the response envelope.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Malformed manifest identifier
    #[error("{0}")]
    InvalidIdentifier(String),

    /// No local file and no provider had the manifest
    #[error("{0}")]
    NotFound(String),

    /// Network failure or timeout talking to a provider
    #[error("{0}")]
    UpstreamUnreachable(String),

    /// Provider answered 200 with an unusable body
    #[error("{0}")]
    UpstreamBadResponse(String),

    /// Provider answered with a non-200 status, passed through as-is
    #[error("{message}")]
    UpstreamError { status: u16, message: String },

    /// Placeholder substitution produced invalid JSON
    #[error("{0}")]
    RewriteFailure(String),

    /// Cache backend errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration errors, only raised at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ManifestError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ManifestError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            ManifestError::NotFound(_) => StatusCode::NOT_FOUND,
            ManifestError::UpstreamUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ManifestError::UpstreamBadResponse(_) => StatusCode::BAD_GATEWAY,
            ManifestError::UpstreamError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ManifestError::RewriteFailure(_)
            | ManifestError::Cache(_)
            | ManifestError::Config(_)
            | ManifestError::Internal(_)
            | ManifestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ManifestError::InvalidIdentifier(_) => "invalid_identifier",
            ManifestError::NotFound(_) => "not_found",
            ManifestError::UpstreamUnreachable(_) => "upstream_unreachable",
            ManifestError::UpstreamBadResponse(_) => "upstream_bad_response",
            ManifestError::UpstreamError { .. } => "upstream_error",
            ManifestError::RewriteFailure(_) => "rewrite_failure",
            ManifestError::Cache(_) => "cache",
            ManifestError::Config(_) => "config",
            ManifestError::Internal(_) => "internal",
            ManifestError::Io(_) => "io",
        }
    }

    /// Message shown to the caller; never empty
    pub fn error_message(&self) -> String {
        let message = match self {
            // Don't leak filesystem details
            ManifestError::Io(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        if message.trim().is_empty() {
            "unknown error".to_string()
        } else {
            message
        }
    }
}

/// Error envelope returned to HTTP callers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: u16,
    pub error_message: String,
}

/// Convert ManifestError to HTTP response
impl IntoResponse for ManifestError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(ErrorResponse {
            error_code: status.as_u16(),
            error_message: self.error_message(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for hxprezi operations
pub type HxResult<T> = Result<T, ManifestError>;
