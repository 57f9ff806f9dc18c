//! Authentication resolution
//!
//! Every protected handler asks one [`AuthResolver`] who is calling. The
//! resolver consults both identity providers independently and combines their
//! answers under a single [`TrustPolicy`]; the role gate and the
//! self-deletion check are methods on the result.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AuthError;
use crate::identity::Identity;
use crate::provider::IdentityProvider;

/// How the two identity sources are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustPolicy {
    /// Each source is trusted on its own; either one claiming admin is enough
    #[default]
    Either,
    /// When both sources are present they must name the same user,
    /// otherwise neither is trusted
    Consistent,
}

impl TrustPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustPolicy::Either => "either",
            TrustPolicy::Consistent => "consistent",
        }
    }
}

impl fmt::Display for TrustPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "either" => Ok(TrustPolicy::Either),
            "consistent" => Ok(TrustPolicy::Consistent),
            other => Err(format!("unknown trust policy '{}'", other)),
        }
    }
}

/// The current actor as seen by both sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAuth {
    pub cookie_identity: Option<Identity>,
    pub provider_identity: Option<Identity>,
}

impl ResolvedAuth {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookie_identity.is_some() || self.provider_identity.is_some()
    }

    /// True when either source asserts the admin role
    pub fn is_admin(&self) -> bool {
        self.identities().any(Identity::is_admin)
    }

    /// Provider identity first, then the cookie identity
    pub fn effective_identity(&self) -> Option<&Identity> {
        self.provider_identity
            .as_ref()
            .or(self.cookie_identity.as_ref())
    }

    pub fn effective_user_id(&self) -> Option<i64> {
        self.effective_identity().map(|identity| identity.id)
    }

    /// Whether either source identifies the caller as user `id`
    pub fn is_self(&self, id: i64) -> bool {
        self.identities().any(|identity| identity.id == id)
    }

    pub fn require_authenticated(&self) -> Result<&Identity, AuthError> {
        self.effective_identity().ok_or(AuthError::Unauthenticated)
    }

    /// Role gate: an admin identity, or the reason there is none
    pub fn require_admin(&self) -> Result<&Identity, AuthError> {
        if !self.is_authenticated() {
            return Err(AuthError::Unauthenticated);
        }
        self.identities()
            .find(|identity| identity.is_admin())
            .ok_or(AuthError::InsufficientPermissions)
    }

    fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.provider_identity
            .iter()
            .chain(self.cookie_identity.iter())
    }
}

/// Combines the cookie token and provider session sources
#[derive(Clone)]
pub struct AuthResolver {
    cookie: Arc<dyn IdentityProvider>,
    provider: Arc<dyn IdentityProvider>,
    policy: TrustPolicy,
}

impl AuthResolver {
    pub fn new(
        cookie: Arc<dyn IdentityProvider>,
        provider: Arc<dyn IdentityProvider>,
        policy: TrustPolicy,
    ) -> Self {
        Self {
            cookie,
            provider,
            policy,
        }
    }

    pub fn policy(&self) -> TrustPolicy {
        self.policy
    }

    /// Resolve the caller of a request. Never fails; an unusable credential
    /// from either source just leaves that side empty.
    pub async fn resolve(&self, headers: &HeaderMap) -> ResolvedAuth {
        let resolved = ResolvedAuth {
            cookie_identity: self.cookie.identify(headers).await,
            provider_identity: self.provider.identify(headers).await,
        };

        match (&resolved.cookie_identity, &resolved.provider_identity) {
            (Some(cookie), Some(provider))
                if self.policy == TrustPolicy::Consistent && cookie.id != provider.id =>
            {
                warn!(
                    "Identity sources disagree ({} names user {}, {} names user {}); treating request as anonymous",
                    self.cookie.source().as_str(),
                    cookie.id,
                    self.provider.source().as_str(),
                    provider.id
                );
                ResolvedAuth::anonymous()
            }
            _ => resolved,
        }
    }
}
