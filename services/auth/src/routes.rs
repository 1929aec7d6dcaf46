//! Authentication routes

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use common::{
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::AuthError,
    middleware::authorization_header,
    service::AuthService,
    validation::validate_login_password,
};

/// Request for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("Username is required".to_string());
        }
        validate_login_password(&self.password)
    }
}

/// Create the router for the authentication endpoints
pub fn router() -> Router<AuthService> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// User login endpoint
pub async fn login(
    State(auth): State<AuthService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let outcome = auth
        .login(&payload.username, &payload.password, payload.remember_me)
        .await?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Login successful",
        outcome,
    ))
}

/// Logout endpoint
pub async fn logout(
    State(auth): State<AuthService>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let header = authorization_header(&headers)?;

    let user_id = auth.logout(header).await.map_err(|e| match e {
        AuthError::MissingCredentials => {
            ApiError::BadRequest("Authorization token is required".to_string())
        }
        other => ApiError::from(other),
    })?;

    info!("Logout completed for user {}", user_id);

    Ok(ApiResponse::message(
        StatusCode::OK,
        format!("Logout successful for user: {}", user_id),
    ))
}
