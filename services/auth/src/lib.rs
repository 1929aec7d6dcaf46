//! Authentication and session lifecycle for the products API
//!
//! Owns credential validation, token issuance and verification, the
//! single-slot session registry, the request gate and the login/logout
//! routes. The `api` service mounts [`routes::router`] under `/auth` and
//! guards its own routes with [`middleware::require_auth`].

pub mod clock;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod session;
pub mod validation;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::AuthError;
pub use jwt::{JwtConfig, JwtService};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use service::{AuthService, LoginOutcome};
pub use session::SessionRegistry;
