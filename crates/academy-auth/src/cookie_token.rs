//! Cookie token provider
//!
//! The primary sign-in path: a signed JWT carried in an HTTP-only cookie.

use std::sync::Arc;

use academy_db::{Database, User};
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};
use tracing::{debug, error};

use crate::cookie::CookieSettings;
use crate::error::AuthError;
use crate::identity::{Identity, IdentitySource};
use crate::jwt::JwtManager;
use crate::provider::IdentityProvider;

pub struct CookieTokenProvider {
    jwt: Arc<JwtManager>,
    cookie: CookieSettings,
    db: Database,
}

impl CookieTokenProvider {
    pub fn new(jwt: Arc<JwtManager>, cookie: CookieSettings, db: Database) -> Self {
        Self { jwt, cookie, db }
    }

    /// Issue a token for `user` and the `Set-Cookie` value carrying it
    pub fn issue(&self, user: &User) -> Result<(String, HeaderValue), AuthError> {
        let token = self
            .jwt
            .generate_token(&Identity::from(user), user.token_version)?;
        let header = self.cookie.set_cookie(&token)?;
        Ok((token, header))
    }

    /// `Set-Cookie` value that discards the token
    pub fn clear(&self) -> Result<HeaderValue, AuthError> {
        self.cookie.clear_cookie()
    }
}

#[async_trait]
impl IdentityProvider for CookieTokenProvider {
    fn source(&self) -> IdentitySource {
        IdentitySource::CookieToken
    }

    async fn identify(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = self.cookie.read(headers)?;

        let claims = match self.jwt.validate_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Ignoring cookie token: {}", e);
                return None;
            }
        };
        let claimed = claims.identity()?;

        // Revoked when the account is gone or its password changed after
        // issuance. The role comes from the stored record, not the claims.
        match self.db.get_user_by_id(claimed.id).await {
            Ok(Some(user)) => {
                if claims.ver != user.token_version {
                    debug!("Cookie token for user id {} predates password change", user.id);
                    return None;
                }
                Some(Identity::from(&user))
            }
            Ok(None) => {
                debug!("Cookie token names missing user id {}", claimed.id);
                None
            }
            Err(e) => {
                error!("Failed to check cookie token owner: {}", e);
                None
            }
        }
    }
}
