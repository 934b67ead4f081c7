//! Password hashing and verification.
//!
//! User passwords are stored as Argon2id PHC strings with a random salt
//! drawn from `OsRng`.
//!
//! # Example
//!
//! ```
//! use oidc_auth::password::{hash_password, verify_password};
//!
//! let hash = hash_password("secret123").unwrap();
//! assert!(hash.starts_with("$argon2id$"));
//! assert!(verify_password("secret123", &hash).unwrap());
//! assert!(!verify_password("wrong", &hash).unwrap());
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hash a password for storage using Argon2id.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash.
///
/// Returns `Ok(false)` on mismatch. Returns `Err` only if the hash is not
/// a valid PHC string.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    Ok(result.is_ok())
}
