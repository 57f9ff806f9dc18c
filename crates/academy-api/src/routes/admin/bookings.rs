//! Service booking routes

use academy_db::{BookingQuery, BookingStatus, NewActivityLog};
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
    BookingResponse, Empty, Envelope, ListQuery, Page, UpdateStatusRequest,
};
use crate::state::AppState;

#[derive(Serialize)]
struct BookingPayload {
    booking: BookingResponse,
}

/// GET /api/admin/bookings
async fn list_bookings(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Page<BookingResponse>>>, ApiError> {
    let (offset, limit) = query.bounds();
    let (bookings, total) = state
        .db
        .list_bookings(BookingQuery {
            status: parse_filter(query.status.as_deref())?,
            user_id: query.user_id,
            search: query.search.clone(),
            offset,
            limit,
        })
        .await?;

    Ok(Json(Envelope::ok(Page {
        items: bookings.into_iter().map(Into::into).collect(),
        total,
        offset,
        limit,
    })))
}

/// GET /api/admin/bookings/{id}
async fn get_booking(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<BookingPayload>>, ApiError> {
    let booking = state
        .db
        .get_booking(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking: {}", id)))?;

    Ok(Json(Envelope::ok(BookingPayload {
        booking: booking.into(),
    })))
}

/// PUT /api/admin/bookings/{id}
async fn update_booking(
    RequireAdmin { admin, .. }: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Envelope<BookingPayload>>, ApiError> {
    let status: BookingStatus = parse_filter(Some(&request.status))?
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_string()))?;

    if !state.db.update_booking_status(id, status).await? {
        return Err(ApiError::NotFound(format!("Booking: {}", id)));
    }
    let booking = state
        .db
        .get_booking(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking: {}", id)))?;

    info!("Admin {} marked service booking {} as {}", admin.email, id, status.as_str());
    state
        .record_activity(NewActivityLog {
            action: "update_booking".to_string(),
            resource_type: "booking".to_string(),
            resource_id: Some(id.to_string()),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            details: Some(format!("status={}", status.as_str())),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message(
        "Booking updated",
        BookingPayload {
            booking: booking.into(),
        },
    )))
}

/// DELETE /api/admin/bookings/{id}
async fn delete_booking(
    RequireAdmin { admin, .. }: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    if !state.db.delete_booking(id).await? {
        return Err(ApiError::NotFound(format!("Booking: {}", id)));
    }

    info!("Admin {} deleted service booking {}", admin.email, id);
    state
        .record_activity(NewActivityLog {
            action: "delete_booking".to_string(),
            resource_type: "booking".to_string(),
            resource_id: Some(id.to_string()),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message("Booking deleted", Empty {})))
}

/// Create booking routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/bookings", get(list_bookings))
        .route(
            "/api/admin/bookings/{id}",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
}
