//! Input validation shared by the handlers

use crate::error::ApiError;

/// Maximum allowed password length (prevent DoS with very large passwords)
pub const MAX_PASSWORD_LENGTH: usize = 256;
/// Minimum allowed password length
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum length of short text fields (names, titles, subjects)
const MAX_FIELD_LENGTH: usize = 200;
/// Maximum length of free-form messages
const MAX_MESSAGE_LENGTH: usize = 5000;

/// Trimmed value of a required field
pub fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "{} exceeds maximum length of {} characters",
            field, MAX_FIELD_LENGTH
        )));
    }
    Ok(value.to_string())
}

/// Trimmed value of an optional field; blank counts as absent
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate a free-form message body
pub fn message(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    if value.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "{} exceeds maximum length of {} characters",
            field, MAX_MESSAGE_LENGTH
        )));
    }
    Ok(value.to_string())
}

/// Validate an email address shape and return it normalized
pub fn email(value: &str) -> Result<String, ApiError> {
    let value = value.trim().to_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid || value.len() > MAX_FIELD_LENGTH {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    Ok(value)
}

/// Validate password length
pub fn password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
