//! User model and related functionality

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub department: String,
    pub active: bool,
}

/// New user provisioning payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    /// Plaintext password, hashed before it is stored
    pub password: String,
    pub role: String,
    pub department: String,
}

/// Identity attached to a request that passed the auth gate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub department: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            role: user.role,
            department: user.department,
        }
    }
}
