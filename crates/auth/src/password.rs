//! Password hashing (bcrypt).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hash a plaintext password with bcrypt (salted, default cost).
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    pwhash::bcrypt::hash(plain).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Constant-time verification of a plaintext password against a stored hash.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    pwhash::bcrypt::verify(plain, hash)
}
