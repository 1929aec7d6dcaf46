//! In-process session registry
//!
//! Holds at most one live session per user. Writing a session for a user
//! replaces whatever that user had before, so only the most recently issued
//! token is ever honored. The table is process-local: after a restart every
//! user appears logged out.

use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{clock::SharedClock, error::AuthError, models::SessionRecord};

/// Records keyed by session id, plus the user-id index
#[derive(Debug, Default)]
struct SessionTable {
    by_id: HashMap<Uuid, SessionRecord>,
    by_user: HashMap<i64, Uuid>,
}

impl SessionTable {
    fn remove_user(&mut self, user_id: i64) -> Option<SessionRecord> {
        let session_id = self.by_user.remove(&user_id)?;
        self.by_id.remove(&session_id)
    }
}

/// Single-slot session registry
#[derive(Clone)]
pub struct SessionRegistry {
    table: Arc<Mutex<SessionTable>>,
    clock: SharedClock,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new(clock: SharedClock) -> Self {
        Self {
            table: Arc::new(Mutex::new(SessionTable::default())),
            clock,
        }
    }

    /// Store `token` as the only session of `user_id`
    ///
    /// Lookup, delete and insert happen under one guard. The write is checked
    /// before anything is touched, so a failed call leaves the table as it was.
    pub async fn put(
        &self,
        user_id: i64,
        username: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRecord, AuthError> {
        let record = SessionRecord {
            session_id: Uuid::new_v4(),
            user_id,
            username: username.to_string(),
            token: token.to_string(),
            created_at: self.clock.now(),
            expires_at,
        };

        let mut table = self.table.lock().await;

        if table.by_id.contains_key(&record.session_id) {
            return Err(AuthError::Registry(format!(
                "session id {} already in use",
                record.session_id
            )));
        }

        if let Some(previous) = table.remove_user(user_id) {
            debug!(
                "Superseding session {} for user {}",
                previous.session_id, user_id
            );
        }

        table.by_user.insert(user_id, record.session_id);
        table.by_id.insert(record.session_id, record.clone());

        info!("Stored session {} for user {}", record.session_id, user_id);
        Ok(record)
    }

    /// Live session of `user_id`; expired records count as absent
    pub async fn get(&self, user_id: i64) -> Option<SessionRecord> {
        let now = self.clock.now();
        let table = self.table.lock().await;

        table
            .by_user
            .get(&user_id)
            .and_then(|session_id| table.by_id.get(session_id))
            .filter(|record| !record.is_expired_at(now))
            .cloned()
    }

    /// Whether `token` is the live session token of `user_id`
    pub async fn is_current(&self, user_id: i64, token: &str) -> bool {
        self.get(user_id)
            .await
            .is_some_and(|record| record.token == token)
    }

    /// Drop the session of `user_id`, if any
    pub async fn remove(&self, user_id: i64) -> Option<SessionRecord> {
        let removed = self.table.lock().await.remove_user(user_id);
        if let Some(record) = &removed {
            info!("Removed session {} for user {}", record.session_id, user_id);
        }
        removed
    }

    /// Evict every expired record, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut table = self.table.lock().await;

        let expired: Vec<i64> = table
            .by_id
            .values()
            .filter(|record| record.is_expired_at(now))
            .map(|record| record.user_id)
            .collect();

        for user_id in &expired {
            table.remove_user(*user_id);
        }

        if !expired.is_empty() {
            info!("Purged {} expired sessions", expired.len());
        }
        expired.len()
    }

    /// Number of stored records, expired ones included
    pub async fn len(&self) -> usize {
        self.table.lock().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of stored records belonging to `user_id`
    pub async fn count_for_user(&self, user_id: i64) -> usize {
        self.table
            .lock()
            .await
            .by_id
            .values()
            .filter(|record| record.user_id == user_id)
            .count()
    }
}
