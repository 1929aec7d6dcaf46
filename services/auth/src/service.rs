//! Authentication service: credential validation, login, logout and the
//! per-request authorization check

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::AuthError,
    jwt::JwtService,
    models::{AuthUser, User},
    password::verify_password,
    repositories::{
        LoginHistoryRepository, UserRepository, login_history::record_login, user::set_active,
    },
    session::SessionRegistry,
};

/// Authorization scheme accepted in the `Authorization` header
pub const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// This is the only parser for the header; the gate and logout both use it.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(AuthError::MissingCredentials)?;

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .ok_or(AuthError::MalformedBearer)?;

    if token.is_empty() {
        return Err(AuthError::MalformedBearer);
    }

    Ok(token)
}

/// Successful login result
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    /// Seconds until expiry
    pub expires_in: i64,
    #[serde(skip)]
    pub user_id: i64,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    users: UserRepository,
    history: LoginHistoryRepository,
    sessions: SessionRegistry,
    jwt: JwtService,
    /// Serializes the login commit + registry write against logout, so the
    /// active flag and the registry always change together
    transitions: Arc<Mutex<()>>,
}

impl AuthService {
    pub fn new(pool: SqlitePool, jwt: JwtService, sessions: SessionRegistry) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            history: LoginHistoryRepository::new(pool.clone()),
            pool,
            sessions,
            jwt,
            transitions: Arc::new(Mutex::new(())),
        }
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn history(&self) -> &LoginHistoryRepository {
        &self.history
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Check a username/password pair against the credential store
    ///
    /// Unknown user and wrong password produce the same error.
    pub async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Log a user in and make the new token their only live session
    ///
    /// The active flag and the history row are written in one transaction;
    /// if that fails no session is registered and no token is returned.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<LoginOutcome, AuthError> {
        info!("Login attempt for user: {}", username);

        let user = self.validate_credentials(username, password).await?;

        let ttl = self.jwt.config().ttl_for(remember_me);
        let issued = self.jwt.issue(user.id, &user.username, ttl)?;

        let _transition = self.transitions.lock().await;

        let mut tx = self.pool.begin().await?;
        if !set_active(&mut *tx, user.id, true).await? {
            return Err(AuthError::UserNotFound(user.id));
        }
        record_login(
            &mut *tx,
            user.id,
            &issued.token,
            issued.expires_at,
            issued.issued_at,
        )
        .await?;
        tx.commit().await?;

        self.sessions
            .put(user.id, &user.username, &issued.token, issued.expires_at)
            .await?;

        info!("User {} logged in (remember_me: {})", user.id, remember_me);

        Ok(LoginOutcome {
            expires_in: (issued.expires_at - issued.issued_at).num_seconds(),
            token: issued.token,
            token_type: "Bearer",
            expires_at: issued.expires_at,
            user_id: user.id,
        })
    }

    /// Log out the subject of the presented token
    ///
    /// Clears the active flag and drops the live session. Repeating the call
    /// with the same token succeeds again. A token that a newer login has
    /// superseded is rejected and leaves the newer session alone.
    pub async fn logout(&self, authorization: Option<&str>) -> Result<i64, AuthError> {
        let token = bearer_token(authorization)?;
        let claims = self.jwt.verify(token)?;

        let _transition = self.transitions.lock().await;

        if let Some(live) = self.sessions.get(claims.sub).await {
            if live.token != token {
                warn!("Superseded token presented at logout for user {}", claims.sub);
                return Err(AuthError::SessionSuperseded);
            }
        }

        if !self.users.set_active(claims.sub, false).await? {
            return Err(AuthError::UserNotFound(claims.sub));
        }

        self.sessions.remove(claims.sub).await;

        info!("User {} logged out", claims.sub);
        Ok(claims.sub)
    }

    /// Decide whether a request carrying `authorization` may proceed
    pub async fn authorize(&self, authorization: Option<&str>) -> Result<AuthUser, AuthError> {
        let token = bearer_token(authorization)?;
        let claims = self.jwt.verify(token)?;

        if !self.sessions.is_current(claims.sub, token).await {
            return Err(AuthError::SessionSuperseded);
        }

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound(claims.sub))?;

        if !user.active {
            warn!("Token presented for inactive user {}", user.id);
            return Err(AuthError::UserInactive(user.id));
        }

        Ok(AuthUser::from(user))
    }

    /// Evict expired sessions from the registry
    pub async fn purge_expired_sessions(&self) -> usize {
        self.sessions.purge_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, jwt::JwtConfig, models::NewUser};
    use chrono::Duration;
    use common::database::{DatabaseConfig, init_pool, run_migrations};
    use std::sync::Arc;

    struct Fixture {
        service: AuthService,
        clock: Arc<ManualClock>,
        user_id: i64,
    }

    async fn fixture() -> Fixture {
        let pool = init_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(ManualClock::default());
        let jwt = JwtService::new(JwtConfig::with_secret("service-test-secret"), clock.clone())
            .unwrap();
        let sessions = SessionRegistry::new(clock.clone());
        let service = AuthService::new(pool, jwt, sessions);

        let user = service
            .users()
            .create(&NewUser {
                username: "user1".into(),
                password: "password123".into(),
                role: "user".into(),
                department: "Sales".into(),
            })
            .await
            .unwrap();

        Fixture {
            service,
            clock,
            user_id: user.id,
        }
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert!(matches!(bearer_token(None), Err(AuthError::MissingCredentials)));
        assert!(matches!(bearer_token(Some("")), Err(AuthError::MissingCredentials)));
        assert!(matches!(bearer_token(Some("   ")), Err(AuthError::MissingCredentials)));
        assert!(matches!(bearer_token(Some("abc.def.ghi")), Err(AuthError::MalformedBearer)));
        assert!(matches!(bearer_token(Some("Basic abc")), Err(AuthError::MalformedBearer)));
        assert!(matches!(bearer_token(Some("Bearer    ")), Err(AuthError::MalformedBearer)));
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[tokio::test]
    async fn test_validate_credentials_hides_which_field_failed() {
        let f = fixture().await;

        let user = f.service.validate_credentials("user1", "password123").await.unwrap();
        assert_eq!(user.id, f.user_id);

        let wrong_password = f.service.validate_credentials("user1", "nope").await.unwrap_err();
        let unknown_user = f.service.validate_credentials("ghost", "password123").await.unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_login_activates_user_and_registers_session() {
        let f = fixture().await;
        let outcome = f.service.login("user1", "password123", false).await.unwrap();

        assert_eq!(outcome.expires_in, 24 * 3600);
        assert!(f.service.users().find_by_id(f.user_id).await.unwrap().unwrap().active);
        assert!(f.service.sessions().is_current(f.user_id, &outcome.token).await);

        let history = f.service.history().most_recent_session(f.user_id).await.unwrap().unwrap();
        assert_eq!(history.token, outcome.token);
    }

    #[tokio::test]
    async fn test_bad_login_changes_nothing() {
        let f = fixture().await;
        assert!(matches!(
            f.service.login("user1", "wrong", false).await,
            Err(AuthError::InvalidCredentials)
        ));

        assert!(!f.service.users().find_by_id(f.user_id).await.unwrap().unwrap().active);
        assert!(f.service.sessions().is_empty().await);
        assert_eq!(f.service.history().count_for_user(f.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_login_supersedes_first() {
        let f = fixture().await;
        let first = f.service.login("user1", "password123", false).await.unwrap();
        let second = f.service.login("user1", "password123", false).await.unwrap();

        assert!(f.service.authorize(Some(&bearer(&second.token))).await.is_ok());
        assert!(matches!(
            f.service.authorize(Some(&bearer(&first.token))).await,
            Err(AuthError::SessionSuperseded)
        ));
        assert_eq!(f.service.sessions().count_for_user(f.user_id).await, 1);
        assert_eq!(f.service.history().count_for_user(f.user_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_authorize_returns_identity() {
        let f = fixture().await;
        let outcome = f.service.login("user1", "password123", false).await.unwrap();

        let user = f.service.authorize(Some(&bearer(&outcome.token))).await.unwrap();
        assert_eq!(user.user_id, f.user_id);
        assert_eq!(user.username, "user1");
        assert_eq!(user.role, "user");
    }

    #[tokio::test]
    async fn test_authorize_rejects_expired_token() {
        let f = fixture().await;
        let outcome = f.service.login("user1", "password123", false).await.unwrap();

        f.clock.advance(Duration::hours(24));
        assert!(matches!(
            f.service.authorize(Some(&bearer(&outcome.token))).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_remember_me_lasts_a_week() {
        let f = fixture().await;
        let outcome = f.service.login("user1", "password123", true).await.unwrap();
        assert_eq!(outcome.expires_in, 7 * 24 * 3600);

        f.clock.advance(Duration::days(7) - Duration::minutes(1));
        assert!(f.service.authorize(Some(&bearer(&outcome.token))).await.is_ok());

        f.clock.advance(Duration::minutes(1));
        assert!(matches!(
            f.service.authorize(Some(&bearer(&outcome.token))).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_authorize_rejects_inactive_user() {
        let f = fixture().await;
        let outcome = f.service.login("user1", "password123", false).await.unwrap();

        f.service.users().set_active(f.user_id, false).await.unwrap();
        assert!(matches!(
            f.service.authorize(Some(&bearer(&outcome.token))).await,
            Err(AuthError::UserInactive(_))
        ));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent_and_blocks_token() {
        let f = fixture().await;
        let outcome = f.service.login("user1", "password123", false).await.unwrap();
        let header = bearer(&outcome.token);

        assert_eq!(f.service.logout(Some(&header)).await.unwrap(), f.user_id);
        assert_eq!(f.service.logout(Some(&header)).await.unwrap(), f.user_id);

        assert!(!f.service.users().find_by_id(f.user_id).await.unwrap().unwrap().active);
        assert!(f.service.authorize(Some(&header)).await.is_err());
    }

    #[tokio::test]
    async fn test_logout_requires_valid_bearer() {
        let f = fixture().await;
        assert!(matches!(f.service.logout(None).await, Err(AuthError::MissingCredentials)));
        assert!(matches!(
            f.service.logout(Some("raw-token")).await,
            Err(AuthError::MalformedBearer)
        ));
        assert!(matches!(
            f.service.logout(Some("Bearer not.a.jwt")).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_token_for_unknown_user_is_rejected() {
        let f = fixture().await;
        let issued = f.service.jwt().issue(4242, "ghost", Duration::hours(1)).unwrap();
        f.service
            .sessions()
            .put(4242, "ghost", &issued.token, issued.expires_at)
            .await
            .unwrap();

        assert!(matches!(
            f.service.authorize(Some(&bearer(&issued.token))).await,
            Err(AuthError::UserNotFound(4242))
        ));
    }

    #[tokio::test]
    async fn test_valid_token_without_session_is_rejected() {
        let f = fixture().await;
        let issued = f.service.jwt().issue(f.user_id, "user1", Duration::hours(1)).unwrap();
        f.service.users().set_active(f.user_id, true).await.unwrap();

        assert!(matches!(
            f.service.authorize(Some(&bearer(&issued.token))).await,
            Err(AuthError::SessionSuperseded)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_logins_leave_one_session() {
        let f = fixture().await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = f.service.clone();
                tokio::spawn(async move { service.login("user1", "password123", false).await })
            })
            .collect();

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap().token);
        }

        assert_eq!(f.service.sessions().count_for_user(f.user_id).await, 1);
        let live = f.service.sessions().get(f.user_id).await.unwrap();
        assert!(tokens.contains(&live.token));

        let authorized = count_authorized(&f.service, &tokens).await;
        assert_eq!(authorized, 1);
    }

    #[tokio::test]
    async fn test_superseded_token_cannot_log_out() {
        let f = fixture().await;
        let old = f.service.login("user1", "password123", false).await.unwrap();
        let new = f.service.login("user1", "password123", false).await.unwrap();

        assert!(matches!(
            f.service.logout(Some(&bearer(&old.token))).await,
            Err(AuthError::SessionSuperseded)
        ));

        assert!(f.service.users().find_by_id(f.user_id).await.unwrap().unwrap().active);
        assert!(f.service.authorize(Some(&bearer(&new.token))).await.is_ok());

        // The live token still logs out, and repeating it stays successful
        assert!(f.service.logout(Some(&bearer(&new.token))).await.is_ok());
        assert!(f.service.logout(Some(&bearer(&new.token))).await.is_ok());
        assert!(f.service.logout(Some(&bearer(&old.token))).await.is_ok());
        assert!(!f.service.users().find_by_id(f.user_id).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn test_logout_without_registered_session_clears_flag() {
        let f = fixture().await;
        let outcome = f.service.login("user1", "password123", false).await.unwrap();

        // Registry lost its state, as after a restart
        f.service.sessions().remove(f.user_id).await;

        assert!(f.service.logout(Some(&bearer(&outcome.token))).await.is_ok());
        assert!(!f.service.users().find_by_id(f.user_id).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn test_racing_login_and_logout_keep_flag_and_registry_in_step() {
        let f = fixture().await;

        for _ in 0..6 {
            let current = f.service.login("user1", "password123", false).await.unwrap();

            let logout = {
                let service = f.service.clone();
                let header = bearer(&current.token);
                tokio::spawn(async move { service.logout(Some(&header)).await })
            };
            let login = {
                let service = f.service.clone();
                tokio::spawn(async move { service.login("user1", "password123", false).await })
            };

            let _ = logout.await.unwrap();
            let fresh = login.await.unwrap().unwrap();

            let active = f.service.users().find_by_id(f.user_id).await.unwrap().unwrap().active;
            let live = f.service.sessions().get(f.user_id).await;
            assert_eq!(active, live.is_some());
            assert!(active);
            assert_eq!(live.unwrap().token, fresh.token);
        }
    }

    async fn count_authorized(service: &AuthService, tokens: &[String]) -> usize {
        let mut count = 0;
        for token in tokens {
            if service.authorize(Some(&bearer(token))).await.is_ok() {
                count += 1;
            }
        }
        count
    }
}
