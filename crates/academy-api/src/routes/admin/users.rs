//! User management routes

use academy_auth::hash_password;
use academy_db::{NewActivityLog, NewUser, UpdateProfile, UpdateUser, UserQuery, UserRole};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::routes::auth::RequireAdmin;
use crate::routes::types::{
    CreateUserRequest, Empty, Envelope, ListQuery, Page, UpdateUserRequest, UserPayload,
    UserResponse,
};
use crate::routes::{parse_filter, validation};
use crate::state::AppState;

fn parse_role(value: &str) -> Result<UserRole, ApiError> {
    UserRole::from_str(value.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid role: {}", value)))
}

/// GET /api/admin/users
async fn list_users(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Page<UserResponse>>>, ApiError> {
    let (offset, limit) = query.bounds();
    let (users, total) = state
        .db
        .list_users(UserQuery {
            search: query.search.clone(),
            role: parse_filter(query.role.as_deref())?,
            offset,
            limit,
        })
        .await?;

    Ok(Json(Envelope::ok(Page {
        items: users.into_iter().map(Into::into).collect(),
        total,
        offset,
        limit,
    })))
}

/// POST /api/admin/users
///
/// Accounts created here are verified from the start.
async fn create_user(
    RequireAdmin { admin, .. }: RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Envelope<UserPayload>>), ApiError> {
    let first_name = validation::required("First name", &request.first_name)?;
    let last_name = validation::required("Last name", &request.last_name)?;
    let email = validation::email(&request.email)?;
    validation::password(&request.password)?;
    let role = parse_role(&request.role)?;

    debug!("Creating user: {}", email);
    let password_hash = hash_password(&request.password)?;

    let user = state
        .db
        .insert_user(NewUser {
            email,
            first_name,
            last_name,
            phone: validation::optional(request.phone),
            password_hash,
            role,
            is_email_verified: true,
            verification_token: None,
            verification_expires_at: None,
        })
        .await?;

    info!("Admin {} created user id {} ({})", admin.email, user.id, user.role);
    state
        .record_activity(NewActivityLog {
            action: "create_user".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(user.id.to_string()),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            details: Some(format!("role={}", user.role)),
            ..Default::default()
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "User created",
            UserPayload { user: user.into() },
        )),
    ))
}

/// GET /api/admin/users/{id}
async fn get_user(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<UserPayload>>, ApiError> {
    let user = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User: {}", id)))?;

    Ok(Json(Envelope::ok(UserPayload { user: user.into() })))
}

/// PUT /api/admin/users/{id}
async fn update_user(
    RequireAdmin { admin, .. }: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Envelope<UserPayload>>, ApiError> {
    debug!("Updating user: {}", id);

    // Validate everything before writing anything
    let role = request.role.as_deref().map(parse_role).transpose()?;
    let password_hash = match &request.password {
        Some(password) => {
            validation::password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };
    let profile = UpdateProfile {
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

    let mut changes = Vec::new();
    if let Some(role) = role {
        changes.push(format!("role={}", role));
    }
    if password_hash.is_some() {
        changes.push("password reset".to_string());
    }

    let updated = state
        .db
        .update_user(
            id,
            UpdateUser {
                profile,
                role,
                password_hash,
            },
        )
        .await?;
    if !updated {
        return Err(ApiError::NotFound(format!("User: {}", id)));
    }

    let user = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User: {}", id)))?;

    info!("Admin {} updated user id {}", admin.email, user.id);
    state
        .record_activity(NewActivityLog {
            action: "update_user".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(id.to_string()),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            details: (!changes.is_empty()).then(|| changes.join(", ")),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message(
        "User updated",
        UserPayload { user: user.into() },
    )))
}

/// DELETE /api/admin/users/{id}
///
/// An admin can never delete the account they are signed in as, through
/// either identity source.
async fn delete_user(
    RequireAdmin { admin, auth }: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    if auth.is_self(id) {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    debug!("Deleting user: {}", id);
    let deleted = state.db.delete_user(id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("User: {}", id)));
    }

    info!("Admin {} deleted user id {}", admin.email, id);
    state
        .record_activity(NewActivityLog {
            action: "delete_user".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(id.to_string()),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message("User deleted", Empty {})))
}

/// Create user routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users).post(create_user))
        .route(
            "/api/admin/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}
