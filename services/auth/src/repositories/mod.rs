//! Repositories for the credential store and the login history

pub mod login_history;
pub mod user;

pub use login_history::LoginHistoryRepository;
pub use user::UserRepository;
