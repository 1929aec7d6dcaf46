//! JWT service for session token issuance and verification
//!
//! Tokens are HS256-signed JWTs keyed by a process-wide secret. Expiry is
//! checked against the injected [`crate::clock::Clock`] rather than the wall clock so that
//! token lifetimes can be exercised deterministically.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{clock::SharedClock, error::AuthError};

/// Default token lifetime in hours (1 day)
const DEFAULT_TTL_HOURS: i64 = 24;
/// "Remember me" token lifetime in hours (7 days)
const REMEMBER_ME_TTL_HOURS: i64 = 24 * 7;
/// Default issuer label
const DEFAULT_ISSUER: &str = "products-api";

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret for signing and verifying tokens
    pub secret: String,
    /// Issuer label embedded in and required from every token
    pub issuer: String,
    /// Lifetime of a regular session token
    pub default_ttl: Duration,
    /// Lifetime of a "remember me" session token
    pub remember_me_ttl: Duration,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: HMAC signing secret (required, must not be empty)
    /// - `JWT_ISSUER`: Issuer label (default: "products-api")
    /// - `JWT_DEFAULT_TTL_HOURS`: Regular token lifetime (default: 24)
    /// - `JWT_REMEMBER_ME_TTL_HOURS`: Remember-me token lifetime (default: 168)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string());

        Ok(JwtConfig {
            secret,
            issuer,
            default_ttl: ttl_from_env("JWT_DEFAULT_TTL_HOURS", DEFAULT_TTL_HOURS)?,
            remember_me_ttl: ttl_from_env("JWT_REMEMBER_ME_TTL_HOURS", REMEMBER_ME_TTL_HOURS)?,
        })
    }

    /// Configuration with the default lifetimes and issuer
    pub fn with_secret(secret: impl Into<String>) -> Self {
        JwtConfig {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            default_ttl: Duration::hours(DEFAULT_TTL_HOURS),
            remember_me_ttl: Duration::hours(REMEMBER_ME_TTL_HOURS),
        }
    }

    /// Token lifetime selected by the login flow
    pub fn ttl_for(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me_ttl
        } else {
            self.default_ttl
        }
    }
}

/// Read a token lifetime in hours; it must be positive and leave room for an
/// expiry date after now
fn ttl_from_env(key: &str, default_hours: i64) -> Result<Duration> {
    let hours = match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("{key} must be a whole number of hours"))?,
        Err(_) => default_hours,
    };

    if hours <= 0 {
        anyhow::bail!("{key} must be positive, got {hours}");
    }

    let ttl = Duration::try_hours(hours)
        .ok_or_else(|| anyhow::anyhow!("{key} is out of range"))?;
    if Utc::now().checked_add_signed(ttl).is_none() {
        anyhow::bail!("{key} is out of range");
    }

    Ok(ttl)
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    /// Username at issuance time
    pub username: String,
    /// Issuer label
    pub iss: String,
    /// Issued at time (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
    /// Unique token identifier
    pub jti: Uuid,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

struct JwtKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    keys: Arc<JwtKeys>,
    config: JwtConfig,
    clock: SharedClock,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig, clock: SharedClock) -> Result<Self> {
        if config.secret.trim().is_empty() {
            anyhow::bail!("JWT secret must not be empty");
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is checked against the injected clock in `verify`
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        info!("JWT service initialized for issuer {}", config.issuer);

        Ok(JwtService {
            keys: Arc::new(JwtKeys {
                encoding_key,
                decoding_key,
                validation,
            }),
            config,
            clock,
        })
    }

    /// Sign a token for `user_id` valid for `ttl` from now
    pub fn issue(
        &self,
        user_id: i64,
        username: &str,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthError> {
        if ttl <= Duration::zero() {
            return Err(AuthError::TokenLifetime(format!("non-positive ttl {ttl}")));
        }

        let issued_at = self.clock.now();
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::TokenLifetime(format!("ttl {ttl} overflows expiry")))?;

        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iss: self.config.issuer.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys.encoding_key,
        )
        .map_err(AuthError::Signing)?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Validate a token and return the claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, &self.keys.decoding_key, &self.keys.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let claims = token_data.claims;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    /// Token lifetime policy
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}
