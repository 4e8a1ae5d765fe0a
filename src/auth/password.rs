//! Password hashing and verification.
//!
//! Argon2id with a per-hash random salt. Hashing the same password twice
//! produces different strings; verification parses the salt and parameters
//! back out of the stored hash.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;

/// Hash a plaintext password for storage.
pub fn hash(plaintext: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default().hash_password(plaintext.as_bytes(), &salt)?;
    Ok(hashed.to_string())
}

/// Verify a plaintext password against a stored hash.
///
/// Fails closed: a malformed stored hash verifies as `false` rather than
/// surfacing an error to the caller.
pub fn verify(plaintext: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
