//! Academy Authentication and Authorization
//!
//! This crate provides password hashing, JWT issuance, the cookie adapter,
//! the two identity providers (cookie token and provider session) and the
//! resolver that combines them into a single view of the current actor.

pub mod cookie;
pub mod cookie_token;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod provider;
pub mod provider_session;
pub mod resolver;
pub mod token;

pub use cookie::{CookieSettings, read_cookie};
pub use cookie_token::CookieTokenProvider;
pub use credentials::authenticate;
pub use error::AuthError;
pub use identity::{Identity, IdentitySource};
pub use jwt::{Claims, JwtManager};
pub use password::{hash_password, verify_password};
pub use provider::IdentityProvider;
pub use provider_session::{ProviderSessionProvider, SignedIn};
pub use resolver::{AuthResolver, ResolvedAuth, TrustPolicy};
pub use token::{generate_opaque_token, token_digest};
