//! JWT token management

use academy_db::UserRole;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::error::AuthError;
use crate::identity::Identity;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// User role
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Credential version of the subject at issuance
    #[serde(default)]
    pub ver: i64,
}

impl Claims {
    /// Identity carried by the claims; `None` if the subject or role is not
    /// one this system issues.
    pub fn identity(&self) -> Option<Identity> {
        Some(Identity {
            id: self.sub.parse().ok()?,
            email: self.email.clone(),
            role: UserRole::from_str(&self.role).ok()?,
        })
    }
}

/// JWT manager for token generation and validation
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

impl JwtManager {
    /// Create a new JWT manager
    pub fn new(secret: &str, token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry_hours,
        }
    }

    /// Lifetime of issued tokens in seconds
    pub fn expiry_secs(&self) -> i64 {
        self.token_expiry_hours * 3600
    }

    /// Generate a JWT token for an identity at the given credential version
    pub fn generate_token(&self, identity: &Identity, version: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.token_expiry_hours);

        let claims = Claims {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            role: identity.role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            ver: version,
        };

        debug!("Generating token for user: {}", identity.email);

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AuthError::Jwt)
    }

    /// Validate a JWT token and return claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::default();

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })?;

        // Check expiration
        let now = Utc::now().timestamp();
        if token_data.claims.exp < now {
            return Err(AuthError::TokenExpired);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: UserRole) -> Identity {
        Identity {
            id: 42,
            email: "tutor@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_token_generation_and_validation() {
        let manager = JwtManager::new("test-secret-key", 24);

        let token = manager.generate_token(&identity(UserRole::Teacher), 3).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "tutor@example.com");
        assert_eq!(claims.role, "teacher");
        assert_eq!(claims.identity(), Some(identity(UserRole::Teacher)));
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        assert_eq!(claims.ver, 3);
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new("test-secret-key", 24);

        let result = manager.validate_token("invalid-token");
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rotated_secret_rejects_old_tokens() {
        let old = JwtManager::new("secret-one", 24);
        let new = JwtManager::new("secret-two", 24);

        let token = old.generate_token(&identity(UserRole::Admin), 0).unwrap();
        assert!(matches!(new.validate_token(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let manager = JwtManager::new("test-secret-key", 24);
        let token = manager.generate_token(&identity(UserRole::User), 0).unwrap();

        let mut bytes = token.into_bytes();
        let middle = bytes.len() / 2;
        bytes[middle] = if bytes[middle] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(manager.validate_token(&tampered).is_err());
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager::new("test-secret-key", -2);
        let token = manager.generate_token(&identity(UserRole::User), 0).unwrap();

        assert!(matches!(manager.validate_token(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_unknown_role_yields_no_identity() {
        let claims = Claims {
            sub: "1".to_string(),
            email: "x@example.com".to_string(),
            role: "root".to_string(),
            exp: 0,
            iat: 0,
            ver: 0,
        };
        assert!(claims.identity().is_none());
    }
}
