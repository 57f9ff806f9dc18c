//! Authentication extractors and routes

use academy_auth::{
    AuthError, Identity, IdentitySource, ResolvedAuth, authenticate, generate_opaque_token,
    hash_password, token_digest,
};
use academy_db::{NewActivityLog, NewUser, UserRole};
use axum::{
    Json, Router,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE, request::Parts},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;

use super::client_ip;
use super::types::{
    EmailRequest, Empty, Envelope, IdentityResponse, LoginRequest, MeResponse,
    RegisterRequest, ResetPasswordRequest, SessionPayload, SessionResponse, TokenRequest,
    UserPayload, UserResponse,
};
use super::validation;

// ==================== Auth Extractors ====================

/// The resolved caller; never rejects, anonymous callers get an empty result
pub struct CurrentAuth(pub ResolvedAuth);

impl<S> FromRequestParts<S> for CurrentAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(CurrentAuth(app_state.resolver.resolve(&parts.headers).await))
    }
}

/// Extractor for an authenticated caller (required)
pub struct RequireAuth {
    /// Effective identity: provider session first, then cookie token
    pub identity: Identity,
    pub auth: ResolvedAuth,
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentAuth(auth) = CurrentAuth::from_request_parts(parts, state).await?;

        let identity = match auth.require_authenticated() {
            Ok(identity) => identity.clone(),
            Err(e) => {
                debug!("Unauthenticated request to {}", parts.uri.path());
                return Err(e.into());
            }
        };

        debug!("Authenticated user: {} ({})", identity.email, identity.role);
        Ok(RequireAuth { identity, auth })
    }
}

/// Extractor for an admin caller (the role gate).
///
/// Runs before any handler work. Authenticated callers without the admin
/// role are logged and recorded in the activity log.
pub struct RequireAdmin {
    pub admin: Identity,
    pub auth: ResolvedAuth,
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let auth = app_state.resolver.resolve(&parts.headers).await;

        match auth.require_admin() {
            Ok(admin) => Ok(RequireAdmin {
                admin: admin.clone(),
                auth: auth.clone(),
            }),
            Err(AuthError::InsufficientPermissions) => {
                let actor = auth.effective_identity();
                warn!(
                    "Admin access denied for user {} on {} {}",
                    actor.map(|a| a.email.as_str()).unwrap_or("unknown"),
                    parts.method,
                    parts.uri.path()
                );
                metrics::counter!("academy_access_denied_total", "reason" => "forbidden")
                    .increment(1);
                app_state
                    .record_activity(NewActivityLog {
                        action: "access_denied".to_string(),
                        resource_type: "admin".to_string(),
                        resource_id: Some(parts.uri.path().to_string()),
                        user_id: actor.map(|a| a.id),
                        email: actor.map(|a| a.email.clone()),
                        details: Some(format!("{} {}", parts.method, parts.uri.path())),
                        ip_address: client_ip(&parts.headers),
                    })
                    .await;
                Err(AuthError::InsufficientPermissions.into())
            }
            Err(e) => {
                debug!("Unauthenticated request to {}", parts.uri.path());
                metrics::counter!("academy_access_denied_total", "reason" => "unauthenticated")
                    .increment(1);
                Err(e.into())
            }
        }
    }
}

// ==================== Auth Routes ====================

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<UserPayload>>), ApiError> {
    let registration_open = state.settings.read().allow_registration;
    if !registration_open {
        return Err(ApiError::Forbidden("Registration is currently closed".to_string()));
    }

    let first_name = validation::required("First name", &request.first_name)?;
    let last_name = validation::required("Last name", &request.last_name)?;
    let email = validation::email(&request.email)?;
    validation::password(&request.password)?;

    let password_hash = hash_password(&request.password)?;
    let token = generate_opaque_token();

    let user = state
        .db
        .insert_user(NewUser {
            email,
            first_name,
            last_name,
            phone: validation::optional(request.phone),
            password_hash,
            role: UserRole::User,
            is_email_verified: false,
            verification_token: Some(token_digest(&token)),
            verification_expires_at: Some(Utc::now() + Duration::hours(state.verification_ttl_hours)),
        })
        .await?;

    metrics::counter!("academy_registrations_total").increment(1);
    info!("Registered user id {}", user.id);

    if let Err(e) = state
        .mailer
        .send_verification(&user.email, &user.first_name, &token)
        .await
    {
        warn!("Verification email for user id {} not sent: {}", user.id, e);
    }

    state
        .record_activity(NewActivityLog {
            action: "register".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(user.id.to_string()),
            user_id: Some(user.id),
            email: Some(user.email.clone()),
            ip_address: client_ip(&headers),
            ..Default::default()
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Registration successful. Please check your email to verify your account.",
            UserPayload { user: user.into() },
        )),
    ))
}

/// POST /api/auth/verify-email
async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<Envelope<UserPayload>>, ApiError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("Verification token is required".to_string()));
    }

    let user = state
        .db
        .consume_verification_token(&token_digest(token), Utc::now())
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired verification token".to_string()))?;

    info!("Verified email for user id {}", user.id);
    state
        .record_activity(NewActivityLog {
            action: "verify_email".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(user.id.to_string()),
            user_id: Some(user.id),
            email: Some(user.email.clone()),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message(
        "Email verified successfully. You can now log in.",
        UserPayload { user: user.into() },
    )))
}

/// POST /api/auth/resend-verification
///
/// Answers the same way whether or not the account exists.
async fn resend_verification(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let email = validation::email(&request.email)?;

    if let Some(user) = state.db.get_user_by_email(&email).await? {
        if !user.is_email_verified {
            let token = generate_opaque_token();
            let expires_at = Utc::now() + Duration::hours(state.verification_ttl_hours);
            state
                .db
                .set_verification_token(user.id, &token_digest(&token), expires_at)
                .await?;
            if let Err(e) = state
                .mailer
                .send_verification(&user.email, &user.first_name, &token)
                .await
            {
                warn!("Verification email for user id {} not sent: {}", user.id, e);
            }
        }
    }

    Ok(Json(Envelope::with_message(
        "If an unverified account exists for that email, a new verification link has been sent.",
        Empty {},
    )))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.password.len() > validation::MAX_PASSWORD_LENGTH {
        return Err(AuthError::InvalidCredentials.into());
    }

    let user = match authenticate(&state.db, &request.email, &request.password).await {
        Ok(user) => user,
        Err(e) => {
            let result = match e {
                AuthError::EmailNotVerified => "unverified",
                _ => "failure",
            };
            metrics::counter!("academy_logins_total", "result" => result).increment(1);
            return Err(e.into());
        }
    };

    let (_, cookie) = state.cookie_tokens.issue(&user)?;
    metrics::counter!("academy_logins_total", "result" => "success").increment(1);
    info!("User id {} logged in", user.id);

    state
        .record_activity(NewActivityLog {
            action: "login".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(user.id.to_string()),
            user_id: Some(user.id),
            email: Some(user.email.clone()),
            details: Some(IdentitySource::CookieToken.as_str().to_string()),
            ip_address: client_ip(&headers),
        })
        .await;

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(Envelope::with_message(
            "Login successful",
            UserPayload { user: user.into() },
        )),
    ))
}

/// POST /api/auth/logout
///
/// Clears both cookies and ends the provider session, if any.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    state.provider_sessions.sign_out(&headers).await?;

    Ok((
        AppendHeaders([
            (SET_COOKIE, state.cookie_tokens.clear()?),
            (SET_COOKIE, state.provider_sessions.clear()?),
        ]),
        Json(Envelope::with_message("Logged out successfully", Empty {})),
    ))
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    RequireAuth { identity, auth }: RequireAuth,
) -> Result<Json<Envelope<MeResponse>>, ApiError> {
    let user = state
        .db
        .get_user_by_id(identity.id)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    let mut identities = Vec::new();
    if let Some(provider) = &auth.provider_identity {
        identities.push(IdentityResponse::new(IdentitySource::ProviderSession, provider));
    }
    if let Some(cookie) = &auth.cookie_identity {
        identities.push(IdentityResponse::new(IdentitySource::CookieToken, cookie));
    }

    Ok(Json(Envelope::ok(MeResponse {
        user: user.into(),
        is_admin: auth.is_admin(),
        identities,
    })))
}

/// POST /api/auth/forgot-password
///
/// Answers the same way whether or not the account exists.
async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let email = validation::email(&request.email)?;

    if let Some(user) = state.db.get_user_by_email(&email).await? {
        let token = generate_opaque_token();
        let expires_at = Utc::now() + Duration::hours(state.reset_ttl_hours);
        state
            .db
            .set_reset_token(user.id, &token_digest(&token), expires_at)
            .await?;
        if let Err(e) = state
            .mailer
            .send_password_reset(&user.email, &user.first_name, &token)
            .await
        {
            warn!("Password reset email for user id {} not sent: {}", user.id, e);
        }
        debug!("Issued password reset token for user id {}", user.id);
    }

    Ok(Json(Envelope::with_message(
        "If an account exists for that email, a password reset link has been sent.",
        Empty {},
    )))
}

/// POST /api/auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("Reset token is required".to_string()));
    }
    validation::password(&request.password)?;

    let password_hash = hash_password(&request.password)?;
    let user = state
        .db
        .consume_reset_token(&token_digest(token), &password_hash, Utc::now())
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired reset token".to_string()))?;

    // Cookie tokens lapse through password_changed_at; sessions are dropped here
    state.db.delete_provider_sessions_for_user(user.id).await?;

    info!("Password reset for user id {}", user.id);
    state
        .record_activity(NewActivityLog {
            action: "reset_password".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(user.id.to_string()),
            user_id: Some(user.id),
            email: Some(user.email.clone()),
            ip_address: client_ip(&headers),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message(
        "Password has been reset. You can now log in.",
        Empty {},
    )))
}

// ==================== Provider Session Routes ====================

/// POST /api/auth/session
async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.password.len() > validation::MAX_PASSWORD_LENGTH {
        return Err(AuthError::InvalidCredentials.into());
    }

    let signed_in = match state
        .provider_sessions
        .sign_in(&request.email, &request.password)
        .await
    {
        Ok(signed_in) => signed_in,
        Err(e) => {
            let result = match e {
                AuthError::EmailNotVerified => "unverified",
                _ => "failure",
            };
            metrics::counter!("academy_logins_total", "result" => result).increment(1);
            return Err(e.into());
        }
    };
    metrics::counter!("academy_logins_total", "result" => "success").increment(1);

    let user = signed_in.user;
    state
        .record_activity(NewActivityLog {
            action: "login".to_string(),
            resource_type: "user".to_string(),
            resource_id: Some(user.id.to_string()),
            user_id: Some(user.id),
            email: Some(user.email.clone()),
            details: Some(IdentitySource::ProviderSession.as_str().to_string()),
            ip_address: client_ip(&headers),
        })
        .await;

    Ok((
        AppendHeaders([(SET_COOKIE, signed_in.cookie)]),
        Json(Envelope::ok(SessionPayload {
            session: Some(SessionResponse {
                user: user.into(),
                expires_at: signed_in.session.expires_at.to_rfc3339(),
            }),
        })),
    ))
}

/// GET /api/auth/session
async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<SessionPayload>>, ApiError> {
    let session = match state.provider_sessions.current(&headers).await? {
        Some(session) => state
            .db
            .get_user_by_id(session.user_id)
            .await?
            .map(|user| SessionResponse {
                user: UserResponse::from(user),
                expires_at: session.expires_at.to_rfc3339(),
            }),
        None => None,
    };

    Ok(Json(Envelope::ok(SessionPayload { session })))
}

/// DELETE /api/auth/session
async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    state.provider_sessions.sign_out(&headers).await?;

    Ok((
        AppendHeaders([(SET_COOKIE, state.provider_sessions.clear()?)]),
        Json(Envelope::with_message("Signed out", Empty {})),
    ))
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/verify-email", post(verify_email))
        .route("/api/auth/resend-verification", post(resend_verification))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
        .route(
            "/api/auth/session",
            post(create_session).get(get_session).delete(delete_session),
        )
}
