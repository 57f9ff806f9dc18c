//! Password hashing
//!
//! New digests are Argon2id PHC strings. Verification also accepts bcrypt
//! digests carried over from the previous deployment.

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::rngs::OsRng;

use crate::error::AuthError;

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Check a password against a stored digest.
///
/// Never fails: a malformed or unsupported digest simply does not match.
pub fn verify_password(password: &str, digest: &str) -> bool {
    if BCRYPT_PREFIXES.iter().any(|prefix| digest.starts_with(prefix)) {
        return bcrypt::verify(password, digest).unwrap_or(false);
    }

    match PasswordHash::new(digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("correct horse batterz", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same-password", &a));
        assert!(verify_password("same-password", &b));
    }

    #[test]
    fn test_legacy_bcrypt_digest() {
        let legacy = bcrypt::hash("welcome-back", 4).unwrap();
        assert!(verify_password("welcome-back", &legacy));
        assert!(!verify_password("welcome-bacK", &legacy));
    }

    #[test]
    fn test_malformed_digest_is_false() {
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "plaintext-password"));
        assert!(!verify_password("anything", "$argon2id$v=19$broken"));
        assert!(!verify_password("anything", "$2b$10$tooshort"));
    }
}
