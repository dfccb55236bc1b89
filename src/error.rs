/// Unified error types for the MyPeople admin service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the admin service
#[derive(Error, Debug)]
pub enum AdminError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (no valid identity)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (valid identity, not an admin)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (transition precondition no longer holds)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Audit append failed after a successful mutation; never fatal
    #[error("Audit write failed: {0}")]
    AuditWrite(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert AdminError to an HTTP response.
///
/// Authentication and authorization failures redirect to the login
/// surface; `reason=unauthorized` lets the UI distinguish "signed in but
/// not an admin" from a plain login challenge. Everything else is a JSON
/// error body.
impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            AdminError::Authentication(_) => {
                return Redirect::to("/login").into_response();
            }
            AdminError::Authorization(_) => {
                return Redirect::to("/login?reason=unauthorized").into_response();
            }
            AdminError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            AdminError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            AdminError::Conflict(_) => (
                StatusCode::CONFLICT,
                "Conflict",
                self.to_string(),
            ),
            AdminError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            AdminError::Database(_) | AdminError::Internal(_) | AdminError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
            AdminError::AuditWrite(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                self.to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for admin service operations
pub type AdminResult<T> = Result<T, AdminError>;
