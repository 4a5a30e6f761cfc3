//! Error types for the awards workspace.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Voting Errors ===
    /// A phase transition was attempted from the wrong predecessor state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The voter already holds this vote (or the phase-2 vote for the category).
    #[error("Already voted: {0}")]
    AlreadyVoted(String),

    /// The nominee or category is not open to this vote.
    #[error("Not eligible: {0}")]
    NotEligible(String),

    /// The phase-1 nomination cap was reached.
    #[error("Nomination cap reached: {0}")]
    CapReached(String),

    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // === Server Errors ===
    /// The persistence gateway failed or timed out.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::NotEligible(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_)
            | Self::InvalidState(_)
            | Self::AlreadyVoted(_)
            | Self::CapReached(_) => StatusCode::CONFLICT,

            // 5xx Server Errors
            Self::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidState(_) => "INVALID_STATE",
            Self::AlreadyVoted(_) => "ALREADY_VOTED",
            Self::NotEligible(_) => "NOT_ELIGIBLE",
            Self::CapReached(_) => "CAP_REACHED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voting_errors_are_client_errors() {
        for err in [
            AppError::InvalidState("x".into()),
            AppError::AlreadyVoted("x".into()),
            AppError::NotEligible("x".into()),
            AppError::CapReached("x".into()),
        ] {
            assert!(!err.is_server_error(), "{err} should be a client error");
        }
    }

    #[test]
    fn test_backend_unavailable_is_retryable_server_error() {
        let err = AppError::BackendUnavailable("connection reset".into());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "BACKEND_UNAVAILABLE");
        assert!(err.is_server_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::CapReached(String::new()).error_code(), "CAP_REACHED");
        assert_eq!(AppError::AlreadyVoted(String::new()).error_code(), "ALREADY_VOTED");
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }
}
