//! Authorization code storage trait.
//!
//! # Security Considerations
//!
//! - Never log authorization codes
//! - `consume` must be atomic so a code cannot be redeemed twice

use async_trait::async_trait;

use crate::AuthResult;
use crate::oauth::code::AuthorizationCode;

/// Storage trait for issued authorization codes.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Stores a freshly issued code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be stored.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Atomically removes and returns the code.
    ///
    /// Of any number of concurrent calls with the same value, at most one
    /// receives `Some`. The code is gone afterwards whatever the caller
    /// decides about it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Deletes expired codes, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
