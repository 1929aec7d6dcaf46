//! Middleware for bearer-token authentication and per-client rate limiting

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use common::error::ApiError;
use std::net::SocketAddr;
use tracing::debug;

use crate::{error::AuthError, rate_limiter::RateLimiter, service::AuthService};

/// Raw `Authorization` value; a header that is not visible ASCII is malformed
pub fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| AuthError::MalformedBearer))
        .transpose()
}

/// Reject the request unless it carries the live session token of an active user
///
/// On success the resolved [`crate::models::AuthUser`] is inserted into the
/// request extensions for downstream handlers.
pub async fn require_auth(
    State(auth): State<AuthService>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = authorization_header(req.headers())?;

    let user = auth.authorize(header).await?;
    debug!("Authorized user {} for {}", user.user_id, req.uri().path());

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Reject the request with 429 while its client is over the limit
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req);

    if !limiter.is_allowed(&key).await {
        return Err(ApiError::TooManyRequests);
    }

    Ok(next.run(req).await)
}

/// Client IP, or a shared bucket when the peer address is unknown
fn client_key(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
