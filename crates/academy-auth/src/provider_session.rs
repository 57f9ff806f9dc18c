//! Provider session
//!
//! The secondary sign-in path. A credentials sign-in creates a server-side
//! session keyed by the digest of an opaque random token; the token itself
//! only ever lives in the session cookie. Reading a session resolves the
//! user's current role from the store.

use academy_db::{Database, ProviderSession, User};
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};
use chrono::{Duration, Utc};
use tracing::{debug, error, info};

use crate::cookie::CookieSettings;
use crate::credentials::authenticate;
use crate::error::AuthError;
use crate::identity::{Identity, IdentitySource};
use crate::provider::IdentityProvider;
use crate::token::{generate_opaque_token, token_digest};

/// A freshly created provider session
#[derive(Debug)]
pub struct SignedIn {
    pub user: User,
    pub session: ProviderSession,
    /// `Set-Cookie` value carrying the session token
    pub cookie: HeaderValue,
}

pub struct ProviderSessionProvider {
    db: Database,
    cookie: CookieSettings,
    ttl_hours: i64,
}

impl ProviderSessionProvider {
    pub fn new(db: Database, cookie: CookieSettings, ttl_hours: i64) -> Self {
        Self {
            db,
            cookie,
            ttl_hours,
        }
    }

    /// Authenticate against the credential store and open a session
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let user = authenticate(&self.db, email, password).await?;

        let token = generate_opaque_token();
        let expires_at = Utc::now() + Duration::hours(self.ttl_hours);
        let session = self
            .db
            .create_provider_session(&token_digest(&token), user.id, expires_at)
            .await?;
        let cookie = self.cookie.set_cookie(&token)?;

        info!("Provider session opened for user id {}", user.id);
        Ok(SignedIn {
            user,
            session,
            cookie,
        })
    }

    /// The live session named by the request's session cookie, if any
    pub async fn current(&self, headers: &HeaderMap) -> Result<Option<ProviderSession>, AuthError> {
        let Some(token) = self.cookie.read(headers) else {
            return Ok(None);
        };

        let Some(session) = self.db.get_provider_session(&token_digest(token)).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            debug!("Dropping expired provider session for user id {}", session.user_id);
            self.db.delete_provider_session(&session.id).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// End the session named by the request's session cookie.
    ///
    /// Returns whether a stored session was removed.
    pub async fn sign_out(&self, headers: &HeaderMap) -> Result<bool, AuthError> {
        let Some(token) = self.cookie.read(headers) else {
            return Ok(false);
        };
        let removed = self.db.delete_provider_session(&token_digest(token)).await?;
        if removed {
            info!("Provider session closed");
        }
        Ok(removed)
    }

    /// `Set-Cookie` value that discards the session cookie
    pub fn clear(&self) -> Result<HeaderValue, AuthError> {
        self.cookie.clear_cookie()
    }
}

#[async_trait]
impl IdentityProvider for ProviderSessionProvider {
    fn source(&self) -> IdentitySource {
        IdentitySource::ProviderSession
    }

    async fn identify(&self, headers: &HeaderMap) -> Option<Identity> {
        let session = match self.current(headers).await {
            Ok(session) => session?,
            Err(e) => {
                error!("Failed to read provider session: {}", e);
                return None;
            }
        };

        match self.db.get_user_by_id(session.user_id).await {
            Ok(user) => user.as_ref().map(Identity::from),
            Err(e) => {
                error!("Failed to load provider session owner: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_db::{NewUser, UpdateUser, UserRole};
    use axum::http::header::COOKIE;

    async fn setup(ttl_hours: i64) -> ProviderSessionProvider {
        let db = Database::in_memory().await.unwrap();
        db.insert_user(NewUser {
            email: "coord@example.com".to_string(),
            first_name: "Lina".to_string(),
            last_name: "Farah".to_string(),
            phone: None,
            password_hash: bcrypt::hash("coord-pass", 4).unwrap(),
            role: UserRole::User,
            is_email_verified: true,
            verification_token: None,
            verification_expires_at: None,
        })
        .await
        .unwrap();
        ProviderSessionProvider::new(
            db,
            CookieSettings::new("academy.session-token", ttl_hours * 3600, false),
            ttl_hours,
        )
    }

    /// Turn a `Set-Cookie` value into the matching request header
    fn echo(set_cookie: &HeaderValue) -> HeaderMap {
        let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_sign_in_then_identify() {
        let provider = setup(720).await;
        let signed_in = provider.sign_in("coord@example.com", "coord-pass").await.unwrap();
        assert_eq!(signed_in.user.login_count, 1);

        let headers = echo(&signed_in.cookie);
        let identity = provider.identify(&headers).await.unwrap();
        assert_eq!(identity.email, "coord@example.com");
        assert_eq!(identity.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_session_reflects_current_role() {
        let provider = setup(720).await;
        let signed_in = provider.sign_in("coord@example.com", "coord-pass").await.unwrap();
        let headers = echo(&signed_in.cookie);

        provider
            .db
            .update_user(
                signed_in.user.id,
                UpdateUser {
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let identity = provider.identify(&headers).await.unwrap();
        assert!(identity.is_admin());
    }

    #[tokio::test]
    async fn test_session_is_stored_as_digest() {
        let provider = setup(720).await;
        let signed_in = provider.sign_in("coord@example.com", "coord-pass").await.unwrap();
        let headers = echo(&signed_in.cookie);
        let raw = provider.cookie.read(&headers).unwrap();

        assert_ne!(signed_in.session.id, raw);
        assert_eq!(signed_in.session.id, token_digest(raw));
    }

    #[tokio::test]
    async fn test_sign_out_ends_session() {
        let provider = setup(720).await;
        let signed_in = provider.sign_in("coord@example.com", "coord-pass").await.unwrap();
        let headers = echo(&signed_in.cookie);

        assert!(provider.sign_out(&headers).await.unwrap());
        assert!(provider.identify(&headers).await.is_none());
        assert!(!provider.sign_out(&headers).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let provider = setup(-1).await;
        let signed_in = provider.sign_in("coord@example.com", "coord-pass").await.unwrap();

        let headers = echo(&signed_in.cookie);

        assert!(provider.identify(&headers).await.is_none());
        assert!(provider.db.get_provider_session(&signed_in.session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_token_yields_nothing() {
        let provider = setup(720).await;
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("academy.session-token=forged"));
        assert!(provider.identify(&headers).await.is_none());
    }
}
