//! Health check endpoints

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::error;

use crate::state::AppState;

/// Health status response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Health check handler
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    metrics::counter!("academy_health_checks_total").increment(1);

    let database = match state.db.has_users().await {
        Ok(_) => "ok",
        Err(e) => {
            error!("Health check could not reach the database: {}", e);
            "unavailable"
        }
    };

    Json(HealthResponse {
        status: if database == "ok" { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
}
