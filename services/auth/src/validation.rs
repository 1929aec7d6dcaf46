//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Minimum length for newly provisioned passwords
const MIN_PASSWORD_LENGTH: usize = 8;
/// Upper bound on any password accepted for hashing
const MAX_PASSWORD_LENGTH: usize = 128;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate a password presented at login
pub fn validate_login_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a password chosen for a new account
pub fn validate_new_password(password: &str) -> Result<(), String> {
    validate_login_password(password)?;

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }

    Ok(())
}
