//! Durable, append-only log of issued session tokens

use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::LoginHistoryEntry;

/// Login history repository
#[derive(Clone)]
pub struct LoginHistoryRepository {
    pool: SqlitePool,
}

impl LoginHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a row for a freshly issued token
    pub async fn record_login(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> DatabaseResult<LoginHistoryEntry> {
        record_login(&self.pool, user_id, token, expires_at, created_at).await
    }

    /// The row with the latest expiry for `user_id`, newest first on ties
    pub async fn most_recent_session(
        &self,
        user_id: i64,
    ) -> DatabaseResult<Option<LoginHistoryEntry>> {
        let entry = sqlx::query_as::<_, LoginHistoryEntry>(
            r#"
            SELECT id, user_id, token, expires_at, created_at
            FROM login_history
            WHERE user_id = ?
            ORDER BY expires_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Number of rows recorded for `user_id`
    pub async fn count_for_user(&self, user_id: i64) -> DatabaseResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM login_history WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

/// Append a history row on any executor, so it can join a transaction
pub async fn record_login<'e, E>(
    executor: E,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
) -> DatabaseResult<LoginHistoryEntry>
where
    E: Executor<'e, Database = Sqlite>,
{
    let entry = sqlx::query_as::<_, LoginHistoryEntry>(
        r#"
        INSERT INTO login_history (user_id, token, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, user_id, token, expires_at, created_at
        "#,
    )
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .bind(created_at)
    .fetch_one(executor)
    .await?;

    Ok(entry)
}
