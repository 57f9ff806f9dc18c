//! API error types

use academy_auth::AuthError;
use academy_db::DbError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
            ApiError::Database(e) => match e {
                DbError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("{} not found", msg)),
                DbError::Duplicate(msg) => (StatusCode::CONFLICT, msg.clone()),
                DbError::InvalidSetting { key, reason } => {
                    (StatusCode::BAD_REQUEST, format!("Invalid {}: {}", key, reason))
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string()),
            },
            ApiError::Auth(e) => (e.status(), e.public_message().to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Details of server-side failures stay in the log
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
        }

        let body = axum::Json(json!({
            "success": false,
            "message": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err = ApiError::from(DbError::Duplicate("User 'a@x.com' already exists".into()));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(message.contains("already exists"));
    }

    #[test]
    fn test_storage_detail_is_not_leaked() {
        let err = ApiError::from(DbError::Migration("disk I/O error at page 7".into()));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, INTERNAL_MESSAGE);
    }

    #[test]
    fn test_auth_errors_keep_their_status() {
        let (status, _) = ApiError::from(AuthError::Unauthenticated).status_and_message();
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, message) = ApiError::from(AuthError::EmailNotVerified).status_and_message();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(message, "Please verify your email before logging in");
    }
}
