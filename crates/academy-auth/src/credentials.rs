//! Credential check shared by both sign-in paths

use std::sync::OnceLock;

use academy_db::{Database, User};
use chrono::Utc;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::password::{hash_password, verify_password};

/// Digest verified against when the email is unknown, so both failure
/// paths spend the same hashing time.
fn dummy_digest() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("academy-dummy-password").unwrap_or_default())
}

/// Check an email/password pair against the credential store.
///
/// Unknown email and wrong password both yield
/// [`AuthError::InvalidCredentials`]. An unverified account is only reported
/// as such once the password has matched. On success the login activity is
/// recorded and reflected in the returned user.
pub async fn authenticate(db: &Database, email: &str, password: &str) -> Result<User, AuthError> {
    let Some(mut user) = db.get_user_by_email(email).await? else {
        let _ = verify_password(password, dummy_digest());
        debug!("Login attempt for unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash) {
        warn!("Failed login attempt for user id {}", user.id);
        return Err(AuthError::InvalidCredentials);
    }

    if !user.is_email_verified {
        debug!("Login refused for unverified user id {}", user.id);
        return Err(AuthError::EmailNotVerified);
    }

    db.record_login(user.id).await?;
    user.login_count += 1;
    user.last_login_at = Some(Utc::now());

    Ok(user)
}
