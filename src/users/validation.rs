//! Custom rules and input canonicalisation for the user schemas.
//!
//! Messages end up verbatim in 422 response bodies, so clients match on them.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

lazy_static! {
    static ref NICKNAME_RE: Regex = Regex::new(r"^[\w-]{3,50}$").unwrap();
}

/// Canonicalise input before validation (trim, lowercase emails).
pub trait Normalize {
    fn normalize(&mut self) {}
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim an optional string; blank values become `None`.
pub fn trim_opt(value: &mut Option<String>) {
    if let Some(v) = value.take() {
        let v = v.trim();
        if !v.is_empty() {
            *value = Some(v.to_string());
        }
    }
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn password_failure(value: &str) -> Option<&'static str> {
    let len = value.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Some("Password must be at least 8 characters long");
    }
    if len > PASSWORD_MAX_LEN {
        return Some("Password must be at most 128 characters long");
    }
    if !value.chars().any(|c| c.is_uppercase()) {
        return Some("Password must include at least one uppercase letter");
    }
    if !value.chars().any(|c| c.is_lowercase()) {
        return Some("Password must include at least one lowercase letter");
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must include at least one digit");
    }
    if !value.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        return Some("Password must include at least one special character");
    }
    None
}

/// Password strength; reports the first rule that fails.
pub fn validate_password(value: &str) -> Result<(), ValidationError> {
    match password_failure(value) {
        Some(message) => Err(rule_error("password_strength", message)),
        None => Ok(()),
    }
}

pub fn validate_nickname(value: &str) -> Result<(), ValidationError> {
    if NICKNAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(rule_error(
            "nickname",
            "Nickname must be 3-50 characters of letters, digits, underscores or hyphens",
        ))
    }
}
