//! Site settings routes

use academy_db::{NewActivityLog, SiteSettings};
use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::routes::auth::RequireAdmin;
use crate::routes::types::Envelope;
use crate::state::AppState;

#[derive(Serialize)]
struct SettingsPayload {
    settings: SiteSettings,
}

/// GET /api/admin/settings
async fn get_settings(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Json<Envelope<SettingsPayload>> {
    Json(Envelope::ok(SettingsPayload {
        settings: state.site_settings(),
    }))
}

/// PUT /api/admin/settings
///
/// Persists the whole settings object and swaps the in-memory copy only
/// once the write succeeded.
async fn update_settings(
    RequireAdmin { admin, .. }: RequireAdmin,
    State(state): State<AppState>,
    Json(settings): Json<SiteSettings>,
) -> Result<Json<Envelope<SettingsPayload>>, ApiError> {
    let settings = state.replace_site_settings(settings).await?;

    info!("Admin {} updated site settings", admin.email);
    state
        .record_activity(NewActivityLog {
            action: "update_settings".to_string(),
            resource_type: "settings".to_string(),
            user_id: Some(admin.id),
            email: Some(admin.email.clone()),
            ..Default::default()
        })
        .await;

    Ok(Json(Envelope::with_message(
        "Settings saved",
        SettingsPayload { settings },
    )))
}

/// Create settings routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/admin/settings", get(get_settings).put(update_settings))
}
