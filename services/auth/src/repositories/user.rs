//! User repository for database operations

use common::error::DatabaseResult;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::info;

use crate::{
    error::AuthError,
    models::{NewUser, User},
    password::hash_password,
    validation::{validate_new_password, validate_username},
};

const USER_COLUMNS: &str = "id, username, password_hash, role, department, active";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new, inactive user
    pub async fn create(&self, new_user: &NewUser) -> Result<User, AuthError> {
        info!("Creating new user: {}", new_user.username);

        validate_username(&new_user.username).map_err(AuthError::Validation)?;
        validate_new_password(&new_user.password).map_err(AuthError::Validation)?;
        let password_hash = hash_password(&new_user.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, role, department, active)
            VALUES (?, ?, ?, ?, FALSE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.username)
        .bind(&password_hash)
        .bind(&new_user.role)
        .bind(&new_user.department)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Set the active flag, returning whether the user exists
    pub async fn set_active(&self, id: i64, active: bool) -> DatabaseResult<bool> {
        set_active(&self.pool, id, active).await
    }

    /// Number of provisioned users
    pub async fn count(&self) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Set the active flag on any executor, so it can join a transaction
pub async fn set_active<'e, E>(executor: E, id: i64, active: bool) -> DatabaseResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE users SET active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
