//! Identity asserted by a session source

use academy_db::{User, UserRole};
use serde::{Deserialize, Serialize};

/// The `{id, email, role}` triple a session source vouches for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Where an identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Signed token in the `token` cookie
    CookieToken,
    /// Server-side provider session
    ProviderSession,
}

impl IdentitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentitySource::CookieToken => "cookie_token",
            IdentitySource::ProviderSession => "provider_session",
        }
    }
}
