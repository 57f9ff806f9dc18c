//! Admin back-office routes
//!
//! Every handler here takes [`RequireAdmin`](super::auth::RequireAdmin), so
//! the role gate runs before the handler touches any data.

mod analytics;
mod applications;
mod bookings;
mod contacts;
mod logs;
mod settings;
mod users;

use axum::Router;

use crate::state::AppState;

/// Create admin routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(contacts::routes())
        .merge(applications::routes())
        .merge(bookings::routes())
        .merge(settings::routes())
        .merge(analytics::routes())
        .merge(logs::routes())
}
