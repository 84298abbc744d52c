//! Request field validation.
//!
//! Checks run before any store access and short-circuit on the first
//! violation, which is the one reported to the client.

use crate::error::ApiError;
use crate::models::SignupRequest;
use regex::Regex;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,6}$").unwrap()
    })
}

fn fail(message: &str) -> ApiError {
    ApiError::Validation(message.to_string())
}

/// Normalize an email for lookup and uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate a display name: letters and spaces, at most 100 characters.
pub fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(fail("Name is a required field"));
    }
    if !name.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
        return Err(fail("Name must contain only letters and spaces"));
    }
    if name.chars().count() > 100 {
        return Err(fail("Name must not exceed 100 characters"));
    }
    Ok(())
}

/// Validate a username: 1-39 chars, alphanumeric plus hyphen/underscore,
/// must start and end with an alphanumeric character.
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(fail("Username is a required field"));
    }
    if username.chars().count() > 39 {
        return Err(fail("Username must not exceed 39 characters"));
    }
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let first_ok = username
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric());
    let last_ok = username
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric());
    if !valid_chars || !first_ok || !last_ok {
        return Err(fail(
            "Username can only contain letters, numbers, hyphens (-), and underscores (_), \
             and must not start or end with a hyphen or underscore",
        ));
    }
    Ok(())
}

/// Validate an email address shape.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(fail("Email is a required field"));
    }
    if email.len() > 254 {
        return Err(fail("Email must not exceed 254 characters"));
    }
    if !email_regex().is_match(email) {
        return Err(fail("Invalid email format"));
    }
    Ok(())
}

/// Validate a password: 8-20 chars with lower, upper, digit and special.
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(fail("Password is required"));
    }
    // Character count, not byte length: multibyte characters are legal in
    // the free-form positions.
    let length = password.chars().count();
    if !(8..=20).contains(&length) {
        return Err(fail("Password must be minimum 8 and maximum 20 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(fail("Password must contain at least one lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(fail("Password must contain at least one uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(fail("Password must contain at least one number"));
    }
    if !password.chars().any(|c| "!@#$%^&*(),.?\":{}|<>_".contains(c)) {
        return Err(fail("Password must contain at least one special character"));
    }
    Ok(())
}

/// Validate the full signup payload, reporting the first violation.
pub fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    validate_name(&req.name)?;
    validate_username(&req.username)?;
    validate_email(req.email.trim())?;
    validate_password(&req.password)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(err: ApiError) -> String {
        match err {
            ApiError::Validation(m) => m,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("John Doe").is_ok());
        assert_eq!(msg(validate_name("").unwrap_err()), "Name is a required field");
        assert_eq!(
            msg(validate_name("john123").unwrap_err()),
            "Name must contain only letters and spaces"
        );
        assert!(validate_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("john_doe-99").is_ok());
        assert!(validate_username("j").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(40)).is_err());
        // charset violation
        assert!(validate_username("john@doe").is_err());
        // must not start or end with hyphen/underscore
        assert!(validate_username("_john").is_err());
        assert!(validate_username("john-").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("johndoe@gmail.com").is_ok());
        assert!(validate_email("j.d-x_1@sub.example.co").is_ok());
        assert_eq!(msg(validate_email("").unwrap_err()), "Email is a required field");
        assert_eq!(msg(validate_email("not-an-email").unwrap_err()), "Invalid email format");
        assert!(validate_email("a@b").is_err());
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Johndoe123@").is_ok());
        assert_eq!(msg(validate_password("").unwrap_err()), "Password is required");
        assert!(validate_password("Ab1@").is_err()); // too short
        assert!(validate_password(&format!("Ab1@{}", "x".repeat(20))).is_err()); // too long
        assert_eq!(
            msg(validate_password("ABCDEF12@").unwrap_err()),
            "Password must contain at least one lowercase letter"
        );
        assert_eq!(
            msg(validate_password("abcdef12@").unwrap_err()),
            "Password must contain at least one uppercase letter"
        );
        assert_eq!(
            msg(validate_password("Abcdefgh@").unwrap_err()),
            "Password must contain at least one number"
        );
        assert_eq!(
            msg(validate_password("Abcdefg12").unwrap_err()),
            "Password must contain at least one special character"
        );
    }

    #[test]
    fn test_password_length_counts_characters() {
        // Multibyte characters satisfy the char classes by count, not bytes
        assert!(validate_password("Pässword1@").is_ok());

        // 20 characters but 21 bytes; must still be accepted
        let at_limit = format!("Aä1@{}", "x".repeat(16));
        assert_eq!(at_limit.chars().count(), 20);
        assert!(at_limit.len() > 20);
        assert!(validate_password(&at_limit).is_ok());

        // 21 characters is past the limit
        let over_limit = format!("Aä1@{}", "x".repeat(17));
        assert!(validate_password(&over_limit).is_err());
    }

    #[test]
    fn test_signup_first_violation_wins() {
        let req = SignupRequest {
            name: String::new(),
            username: String::new(),
            email: String::new(),
            password: String::new(),
        };
        // name check fires before the others
        assert_eq!(msg(validate_signup(&req).unwrap_err()), "Name is a required field");
    }
}
