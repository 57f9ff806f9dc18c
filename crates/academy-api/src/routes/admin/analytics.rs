//! Dashboard analytics route

use academy_db::DashboardStats;
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::auth::RequireAdmin;
use crate::routes::types::{AnalyticsQuery, Envelope};
use crate::state::AppState;

const MAX_DAYS: i64 = 365;

#[derive(Serialize)]
struct AnalyticsPayload {
    days: i64,
    stats: DashboardStats,
}

/// GET /api/admin/analytics?days=N
async fn analytics(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Envelope<AnalyticsPayload>>, ApiError> {
    let days = query.days.clamp(1, MAX_DAYS);
    let stats = state.db.dashboard_stats(days).await?;

    Ok(Json(Envelope::ok(AnalyticsPayload { days, stats })))
}

/// Create analytics routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/admin/analytics", get(analytics))
}
