//! Authentication service models

pub mod session;
pub mod user;

// Re-export for convenience
pub use session::{LoginHistoryEntry, SessionRecord};
pub use user::{AuthUser, NewUser, User};
