//! Job application routes

use academy_db::{ApplicationQuery, ApplicationStatus, NewActivityLog};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::routes::auth::RequireAdmin;
use crate::routes::parse_filter;
use crate::routes::types::{
    ApplicationResponse, Empty, Envelope, ListQuery, Page, UpdateStatusRequest,
};
use crate::state::AppState;

#[derive(Serialize)]
struct ApplicationPayload {
    application: ApplicationResponse,
}

/// GET /api/admin/applications
async fn list_applications(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Page<ApplicationResponse>>>, ApiError> {
    let (offset, limit) = query.bounds();
    let (applications, total) = state
        .db
        .list_applications(ApplicationQuery {
            status: parse_filter(query.status.as_deref())?,
            user_id: query.user_id,
            search: query.search.clone(),
            offset,
            limit,
        })
        .await?;

    Ok(Json(Envelope::ok(Page {
        items: applications.into_iter().map(Into::into).collect(),
        total,
        offset,
        limit,
    })))
}

/// GET /api/admin/applications/{id}
async fn get_application(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<ApplicationPayload>>, ApiError> {
    let application = state
        .db
        .get_application(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Application: {}", id)))?;

    Ok(Json(Envelope::ok(ApplicationPayload {
        application: application.into(),
    })))
}

/// PUT /api/admin/applications/{id}
async fn update_application(
    RequireAdmin { admin, .. }: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Envelope<ApplicationPayload>>, ApiError> {
    let status: ApplicationStatus = parse_filter(Some(&request.status))?
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_string()))?;

    if !state.db.update_application_status(id, status).await? {
        return Err(ApiError::NotFound(format!("Application: {}", id)));
    }
    let application = state
        .db
        .get_application(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Application: {}", id)))?;

    info!("Admin {} marked job application {} as {}", admin.email, id, status.as_str());
    state
        .record_activity(NewActivityLog {
            action: "update_application".to_string(),
            resource_type: "application".to_string(),
            resource_id: Some(id.to_string()),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            details: Some(format!("status={}", status.as_str())),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message(
        "Application updated",
        ApplicationPayload {
            application: application.into(),
        },
    )))
}

/// DELETE /api/admin/applications/{id}
async fn delete_application(
    RequireAdmin { admin, .. }: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    if !state.db.delete_application(id).await? {
        return Err(ApiError::NotFound(format!("Application: {}", id)));
    }

    info!("Admin {} deleted job application {}", admin.email, id);
    state
        .record_activity(NewActivityLog {
            action: "delete_application".to_string(),
            resource_type: "application".to_string(),
            resource_id: Some(id.to_string()),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message("Application deleted", Empty {})))
}

/// Create application routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/applications", get(list_applications))
        .route(
            "/api/admin/applications/{id}",
            get(get_application).put(update_application).delete(delete_application),
        )
}
