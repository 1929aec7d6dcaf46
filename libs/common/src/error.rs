//! Custom error types for the common library
//!
//! This module defines the storage error type shared by every service and the
//! HTTP-facing [`ApiError`] rendered into the JSON response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::Error as SqlxError;
use thiserror::Error;
use tracing::error;

use crate::response::ApiResponse;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::Query(err)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Error type returned by HTTP handlers and middleware
///
/// Client-facing messages are fixed per variant except for `BadRequest` and
/// `NotFound`; internal causes are logged and never echoed.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed request body or parameters
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication failure with a deliberately generic message
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Unknown resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Client is temporarily blocked by the rate limiter
    #[error("Too many requests")]
    TooManyRequests,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ApiError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalServerError | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg,
            ApiError::Unauthorized(msg) => msg.to_string(),
            ApiError::TooManyRequests => "Too many requests".to_string(),
            ApiError::InternalServerError => "Internal server error".to_string(),
            ApiError::Database(e) => {
                error!("Database error while handling request: {}", e);
                "Internal server error".to_string()
            }
        };

        ApiResponse::<()>::error(status, message).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
