//! Issued token storage trait.
//!
//! Access and refresh tokens are recorded by value so that `/userinfo` and
//! refresh can check who a token was issued to. ID tokens are not stored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::oauth::authorize_session::SessionUser;
use crate::token::TokenType;

/// What the server remembers about an issued access or refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    /// Access or refresh.
    pub token_type: TokenType,

    /// User the token was issued to.
    pub user: SessionUser,

    /// Client the token was issued to.
    pub client_id: String,

    /// Granted scope.
    pub scope: String,

    /// Expiry, matching the token's `exp` claim.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl StoredToken {
    /// Returns `true` if the token is past its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}

/// Storage trait for issued access and refresh tokens.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Records a token under its value.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    async fn store(&self, token: &str, record: &StoredToken) -> AuthResult<()>;

    /// Looks up a token by value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, token: &str) -> AuthResult<Option<StoredToken>>;

    /// Deletes expired tokens, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
