//! Identity provider abstraction

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::identity::{Identity, IdentitySource};

/// A source of identity for an incoming request.
///
/// Implementations fail closed: a missing, malformed, expired or revoked
/// credential, and any storage error while checking it, all yield `None`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn source(&self) -> IdentitySource;

    async fn identify(&self, headers: &HeaderMap) -> Option<Identity>;
}
