//! Input validation for API requests.
//!
//! This module provides validation functions for API request data,
//! ensuring all inputs meet the required format and constraints.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating usernames (alphanumeric with underscores, 3-32 chars)
    static ref USERNAME_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9_]{3,32}$"
    ).unwrap();
}

/// Validate a username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 3-32 characters of letters, digits, or underscores".to_string(),
        );
    }

    Ok(())
}

/// Validate a password at registration time
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }

    Ok(())
}

/// Validate a display name
pub fn validate_display_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Display name is required".to_string());
    }

    if trimmed.len() < 2 {
        return Err("Display name is too short (min 2 characters)".to_string());
    }

    if trimmed.len() > 120 {
        return Err("Display name is too long (max 120 characters)".to_string());
    }

    Ok(())
}

/// Validate a review body
pub fn validate_review_body(body: &str) -> Result<(), String> {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return Err("Review text is required".to_string());
    }

    if trimmed.len() > 2000 {
        return Err("Review text is too long (max 2000 characters)".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("anna").is_ok());
        assert!(validate_username("user_42").is_ok());
        assert!(validate_username("ABC").is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dash-ed").is_err());
        assert!(validate_username("почта").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("eight ch").is_ok());
        assert!(validate_password("a much longer passphrase").is_ok());

        assert!(validate_password("").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Ivan Ivanov").is_ok());
        assert!(validate_display_name("  padded  ").is_ok());

        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name("x").is_err());
        assert!(validate_display_name(&"n".repeat(121)).is_err());
    }

    #[test]
    fn test_validate_review_body() {
        assert!(validate_review_body("Fast and attentive, thank you.").is_ok());

        assert!(validate_review_body("").is_err());
        assert!(validate_review_body("   \n ").is_err());
        assert!(validate_review_body(&"r".repeat(2001)).is_err());
    }
}
