//! Opaque single-purpose tokens (email verification, password reset,
//! provider sessions)
//!
//! Only the SHA-256 digest of a token is ever stored; the token itself goes to
//! the user by mail or cookie.

use sha2::{Digest, Sha256};

/// Generate a random 256-bit token, hex encoded
pub fn generate_opaque_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Digest under which a token is stored and looked up
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
