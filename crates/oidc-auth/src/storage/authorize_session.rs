//! Authorize session storage trait.
//!
//! Sessions live for the login → consent part of a flow only. Implementations
//! should keep them short-lived and never return an expired one.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::oauth::authorize_session::AuthorizeSession;

/// Storage trait for authorize flow sessions.
#[async_trait]
pub trait AuthorizeSessionStorage: Send + Sync {
    /// Stores a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored.
    async fn create(&self, session: &AuthorizeSession) -> AuthResult<()>;

    /// Finds a session by its ID.
    ///
    /// Returns `None` if the session is unknown or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<AuthorizeSession>>;

    /// Replaces a stored session, e.g. after binding the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not found or the update fails.
    async fn update(&self, session: &AuthorizeSession) -> AuthResult<()>;

    /// Atomically removes and returns a session.
    ///
    /// At most one caller receives a given session. Expired sessions are
    /// removed but not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn take(&self, id: Uuid) -> AuthResult<Option<AuthorizeSession>>;

    /// Deletes a session by ID. Deleting an unknown session is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    async fn delete(&self, id: Uuid) -> AuthResult<()>;

    /// Deletes expired sessions, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
