//! Signed-in member's own account

use academy_auth::{AuthError, hash_password, verify_password};
use academy_db::{
    ApplicationQuery, BookingQuery, NewActivityLog, UpdateProfile, UpdateUser, User,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    routing::{get, put},
};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::RequireAuth;
use super::types::{
    ApplicationResponse, BookingResponse, ChangePasswordRequest, Envelope, ListQuery, Page,
    UpdateProfileRequest, UserPayload,
};
use super::{parse_filter, validation};

async fn load_user(state: &AppState, id: i64) -> Result<User, ApiError> {
    state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AuthError::Unauthenticated.into())
}

/// GET /api/account/profile
async fn get_profile(
    State(state): State<AppState>,
    RequireAuth { identity, .. }: RequireAuth,
) -> Result<Json<Envelope<UserPayload>>, ApiError> {
    let user = load_user(&state, identity.id).await?;
    Ok(Json(Envelope::ok(UserPayload { user: user.into() })))
}

/// PUT /api/account/profile
async fn update_profile(
    State(state): State<AppState>,
    RequireAuth { identity, .. }: RequireAuth,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Envelope<UserPayload>>, ApiError> {
    let update = UpdateProfile {
        first_name: request
            .first_name
            .map(|v| validation::required("First name", &v))
            .transpose()?,
        last_name: request
            .last_name
            .map(|v| validation::required("Last name", &v))
            .transpose()?,
        phone: request.phone.map(|v| validation::optional(Some(v))),
    };

    state.db.update_user_profile(identity.id, update).await?;
    let user = load_user(&state, identity.id).await?;

    info!("User id {} updated their profile", user.id);
    Ok(Json(Envelope::with_message(
        "Profile updated",
        UserPayload { user: user.into() },
    )))
}

/// PUT /api/account/password
///
/// Every previously issued token and provider session of the user stops
/// working; the caller gets a fresh token cookie.
async fn change_password(
    State(state): State<AppState>,
    RequireAuth { identity, .. }: RequireAuth,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = load_user(&state, identity.id).await?;

    if !verify_password(&request.current_password, &user.password_hash) {
        return Err(ApiError::BadRequest("Current password is incorrect".to_string()));
    }
    validation::password(&request.new_password)?;

    let password_hash = hash_password(&request.new_password)?;
    state
        .db
        .update_user(
            user.id,
            UpdateUser {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;

    let user = load_user(&state, user.id).await?;
    let (_, cookie) = state.cookie_tokens.issue(&user)?;

    info!("User id {} changed their password", user.id);
    state
        .record_activity(NewActivityLog {
            action: "change_password".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(user.id.to_string()),
            user_id: Some(user.id),
            email: Some(user.email.clone()),
            ..Default::default()
        })
        .await;

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(Envelope::with_message(
            "Password updated",
            UserPayload { user: user.into() },
        )),
    ))
}

/// GET /api/account/applications
async fn my_applications(
    State(state): State<AppState>,
    RequireAuth { identity, .. }: RequireAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Page<ApplicationResponse>>>, ApiError> {
    let (offset, limit) = query.bounds();
    let (applications, total) = state
        .db
        .list_applications(ApplicationQuery {
            status: parse_filter(query.status.as_deref())?,
            user_id: Some(identity.id),
            search: None,
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

/// GET /api/account/bookings
async fn my_bookings(
    State(state): State<AppState>,
    RequireAuth { identity, .. }: RequireAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Page<BookingResponse>>>, ApiError> {
    let (offset, limit) = query.bounds();
    let (bookings, total) = state
        .db
        .list_bookings(BookingQuery {
            status: parse_filter(query.status.as_deref())?,
            user_id: Some(identity.id),
            search: None,
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

/// Create account routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/account/profile", get(get_profile).put(update_profile))
        .route("/api/account/password", put(change_password))
        .route("/api/account/applications", get(my_applications))
        .route("/api/account/bookings", get(my_bookings))
}
