//! Authentication error types

use academy_db::DbError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are never distinguished
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::Unauthenticated
            | AuthError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotVerified | AuthError::InsufficientPermissions => {
                StatusCode::FORBIDDEN
            }
            AuthError::PasswordHash(_) | AuthError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password",
            AuthError::EmailNotVerified => "Please verify your email before logging in",
            AuthError::InvalidToken | AuthError::Jwt(_) => "Invalid token",
            AuthError::TokenExpired => "Token expired",
            AuthError::Unauthenticated => "Authentication required",
            AuthError::InsufficientPermissions => "Admin access required",
            AuthError::PasswordHash(_) | AuthError::Database(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Authentication failure: {}", self);
        }

        let body = axum::Json(json!({
            "success": false,
            "message": self.public_message()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_and_authorization_are_distinct() {
        assert_eq!(AuthError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InsufficientPermissions.status(),
            StatusCode::FORBIDDEN
        );
        assert_ne!(
            AuthError::Unauthenticated.public_message(),
            AuthError::InsufficientPermissions.public_message()
        );
    }

    #[test]
    fn test_unverified_message_is_specific() {
        assert_ne!(
            AuthError::EmailNotVerified.public_message(),
            AuthError::InvalidCredentials.public_message()
        );
    }

    #[test]
    fn test_storage_errors_are_masked() {
        let err = AuthError::Database(DbError::Migration("table users is locked".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
