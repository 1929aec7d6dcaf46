//! Shared harness for router-level tests

#![allow(dead_code)]

use std::sync::Arc;

use api::{AppState, routes::create_router, seed::populate_initial_data};
use auth::{JwtConfig, ManualClock, RateLimiterConfig};
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header::AUTHORIZATION},
};
use common::database::{DatabaseConfig, init_pool, run_migrations};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const SEED_PASSWORD: &str = "password123";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_rate_limit(RateLimiterConfig {
            burst: 10_000,
            refill_per_second: 10_000.0,
            ..RateLimiterConfig::default()
        })
        .await
    }

    pub async fn with_rate_limit(rate_limit: RateLimiterConfig) -> Self {
        let pool = init_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(ManualClock::default());
        let state = AppState::new(
            pool,
            JwtConfig::with_secret(TEST_SECRET),
            rate_limit,
            clock.clone(),
        )
        .unwrap();
        populate_initial_data(state.auth.users(), &state.products)
            .await
            .unwrap();

        Self {
            router: create_router(state.clone()),
            state,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Log in and return the issued token
    pub async fn login(&self, username: &str, remember_me: bool) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/auth/login",
                None,
                json!({
                    "username": username,
                    "password": SEED_PASSWORD,
                    "remember_me": remember_me,
                }),
            ))
            .await;
        assert_eq!(response.status(), 200);

        let body = body_json(response).await;
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn request(method: &str, uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
