//! Password hashing and verification.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to compute password hash: {0}")]
    Hash(argon2::password_hash::Error),
    /// The stored hash could not be parsed. Kept distinct from a mismatch
    /// so callers can log the corruption instead of reporting a plain
    /// wrong-password.
    #[error("stored password hash is malformed")]
    MalformedHash,
}

/// Hash a password using Argon2 with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(PasswordError::Hash)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash. The comparison itself is
/// constant time inside the argon2 crate; a mismatch is `Ok(false)`, never
/// an error.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|_| PasswordError::MalformedHash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
