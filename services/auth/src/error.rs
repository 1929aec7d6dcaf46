//! Error types for the authentication subsystem

use common::error::{ApiError, DatabaseError};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Message returned for every credential failure
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
/// Message returned for every gate or token rejection
pub const UNAUTHORIZED: &str = "Unauthorized";

/// Authentication error
///
/// Variants stay distinct for logging and tests; [`ApiError`] collapses them
/// into a handful of generic client-facing responses.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown username or wrong password
    #[error("invalid username or password")]
    InvalidCredentials,

    /// No Authorization header, or an empty one
    #[error("missing authorization header")]
    MissingCredentials,

    /// Authorization header without the bearer scheme
    #[error("authorization header is not a bearer token")]
    MalformedBearer,

    /// Bad signature, wrong algorithm, wrong issuer or unparsable token
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Correctly signed token past its expiry
    #[error("token expired")]
    TokenExpired,

    /// Token is no longer the user's current session
    #[error("session superseded or not found")]
    SessionSuperseded,

    /// Subject of a valid token does not exist
    #[error("user {0} not found")]
    UserNotFound(i64),

    /// User is logged out
    #[error("user {0} is not active")]
    UserInactive(i64),

    /// Request failed validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Token signing failed
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Password hashing or hash parsing failed
    #[error("password hash error: {0}")]
    PasswordHash(String),

    /// Requested token lifetime cannot produce a valid expiry
    #[error("token lifetime out of range: {0}")]
    TokenLifetime(String),

    /// Session registry refused the write
    #[error("session registry error: {0}")]
    Registry(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(DatabaseError::Query(err))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                debug!("Rejected login: {}", err);
                ApiError::Unauthorized(INVALID_CREDENTIALS)
            }
            AuthError::Validation(msg) => ApiError::BadRequest(msg),
            AuthError::Database(e) => ApiError::Database(e),
            AuthError::Signing(_)
            | AuthError::TokenLifetime(_)
            | AuthError::PasswordHash(_)
            | AuthError::Registry(_) => {
                error!("Authentication failure: {}", err);
                ApiError::InternalServerError
            }
            rejection => {
                warn!("Rejected request: {}", rejection);
                ApiError::Unauthorized(UNAUTHORIZED)
            }
        }
    }
}
