//! Activity log routes

use academy_db::ActivityLogQuery;
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::auth::RequireAdmin;
use crate::routes::types::{ActivityLogResponse, ActivityLogsQuery, Envelope, Page};
use crate::state::AppState;

#[derive(Serialize)]
struct ActionsPayload {
    actions: Vec<String>,
}

/// GET /api/admin/logs
async fn list_activity_logs(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ActivityLogsQuery>,
) -> Result<Json<Envelope<Page<ActivityLogResponse>>>, ApiError> {
    let offset = query.offset.max(0);
    let limit = query.limit.clamp(1, 100); // Cap at 100

    let (logs, total) = state
        .db
        .list_activity_logs(ActivityLogQuery {
            action: query.action,
            resource_type: query.resource_type,
            user_id: query.user_id,
            start_date: query.start_date,
            end_date: query.end_date,
            offset,
            limit,
        })
        .await?;

    Ok(Json(Envelope::ok(Page {
        items: logs.into_iter().map(Into::into).collect(),
        total,
        offset,
        limit,
    })))
}

/// GET /api/admin/logs/actions - Get distinct action types
async fn get_action_types(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Envelope<ActionsPayload>>, ApiError> {
    let actions = state.db.get_activity_action_types().await?;
    Ok(Json(Envelope::ok(ActionsPayload { actions })))
}

/// Create activity log routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/logs", get(list_activity_logs))
        .route("/api/admin/logs/actions", get(get_action_types))
}
