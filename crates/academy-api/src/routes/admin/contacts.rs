//! Contact message routes

use academy_db::{ContactQuery, ContactStatus, NewActivityLog};
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
    ContactResponse, Empty, Envelope, ListQuery, Page, UpdateStatusRequest,
};
use crate::state::AppState;

#[derive(Serialize)]
struct ContactPayload {
    contact: ContactResponse,
}

/// GET /api/admin/contacts
async fn list_contacts(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Page<ContactResponse>>>, ApiError> {
    let (offset, limit) = query.bounds();
    let (contacts, total) = state
        .db
        .list_contacts(ContactQuery {
            status: parse_filter(query.status.as_deref())?,
            search: query.search.clone(),
            offset,
            limit,
        })
        .await?;

    Ok(Json(Envelope::ok(Page {
        items: contacts.into_iter().map(Into::into).collect(),
        total,
        offset,
        limit,
    })))
}

/// GET /api/admin/contacts/{id}
async fn get_contact(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<ContactPayload>>, ApiError> {
    let contact = state
        .db
        .get_contact(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Contact: {}", id)))?;

    Ok(Json(Envelope::ok(ContactPayload {
        contact: contact.into(),
    })))
}

/// PUT /api/admin/contacts/{id}
async fn update_contact(
    RequireAdmin { admin, .. }: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Envelope<ContactPayload>>, ApiError> {
    let status: ContactStatus = parse_filter(Some(&request.status))?
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_string()))?;

    if !state.db.update_contact_status(id, status).await? {
        return Err(ApiError::NotFound(format!("Contact: {}", id)));
    }
    let contact = state
        .db
        .get_contact(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Contact: {}", id)))?;

    info!("Admin {} marked contact {} as {}", admin.email, id, status.as_str());
    state
        .record_activity(NewActivityLog {
            action: "update_contact".to_string(),
            resource_type: "contact".to_string(),
            resource_id: Some(id.to_string()),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            details: Some(format!("status={}", status.as_str())),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message(
        "Contact updated",
        ContactPayload {
            contact: contact.into(),
        },
    )))
}

/// DELETE /api/admin/contacts/{id}
async fn delete_contact(
    RequireAdmin { admin, .. }: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    if !state.db.delete_contact(id).await? {
        return Err(ApiError::NotFound(format!("Contact: {}", id)));
    }

    info!("Admin {} deleted contact {}", admin.email, id);
    state
        .record_activity(NewActivityLog {
            action: "delete_contact".to_string(),
            resource_type: "contact".to_string(),
            resource_id: Some(id.to_string()),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message("Contact deleted", Empty {})))
}

/// Create contact routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/contacts", get(list_contacts))
        .route(
            "/api/admin/contacts/{id}",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}
