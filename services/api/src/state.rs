//! Application state shared across handlers

use anyhow::Result;
use auth::{
    AuthService, JwtConfig, JwtService, RateLimiter, RateLimiterConfig, SessionRegistry,
    SharedClock,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::repositories::ProductRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub rate_limiter: RateLimiter,
    pub products: ProductRepository,
}

impl AppState {
    /// Wire every service onto one pool and one clock
    pub fn new(
        pool: SqlitePool,
        jwt_config: JwtConfig,
        rate_limit: RateLimiterConfig,
        clock: SharedClock,
    ) -> Result<Self> {
        let jwt = JwtService::new(jwt_config, clock.clone())?;
        let sessions = SessionRegistry::new(clock.clone());

        Ok(Self {
            auth: AuthService::new(pool.clone(), jwt, sessions),
            rate_limiter: RateLimiter::new(rate_limit, clock),
            products: ProductRepository::new(pool),
        })
    }

    /// Evict expired sessions and idle rate limiter entries
    pub async fn sweep(&self) -> (usize, usize) {
        let sessions = self.auth.purge_expired_sessions().await;
        let clients = self.rate_limiter.purge_idle().await;

        if sessions > 0 || clients > 0 {
            info!(
                "Swept {} expired sessions and {} idle clients",
                sessions, clients
            );
        }
        (sessions, clients)
    }
}
