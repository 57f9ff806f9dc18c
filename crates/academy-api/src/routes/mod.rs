//! API routes

mod account;
mod admin;
pub mod auth;
mod health;
pub mod metrics;
mod public;
pub mod types;
mod validation;

#[cfg(test)]
mod tests;

use axum::{Router, extract::DefaultBodyLimit, http::HeaderMap};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::{AppState, MetricsHandle};

pub use auth::{CurrentAuth, RequireAdmin, RequireAuth};

/// Request bodies are small JSON documents
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        // Health check
        .merge(health::routes())
        // Sign-in, sign-out and the current caller
        .merge(auth::routes())
        // Member area
        .merge(account::routes())
        // Public forms and settings
        .merge(public::routes())
        // Back-office
        .merge(admin::routes())
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Parse an optional enum filter such as a status or role
pub(crate) fn parse_filter<T>(value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => T::from_str(v)
            .map(Some)
            .map_err(|e| ApiError::BadRequest(e.to_string())),
        None => Ok(None),
    }
}

/// Best-effort client address from proxy headers
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
