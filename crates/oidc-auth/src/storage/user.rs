//! User storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::User;

/// Read access to resource owners, plus registration for seeding.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Find a user by login name.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the username is already taken.
    async fn create(&self, user: &User) -> AuthResult<User>;
}
