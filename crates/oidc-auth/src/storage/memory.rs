//! In-memory storage backends.
//!
//! Every store is a sharded `DashMap`, safe to share behind `Arc<dyn Trait>`
//! across request handlers. `DashMap::remove` gives authorization codes their
//! atomic take. Contents are lost on restart.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::authorize_session::AuthorizeSession;
use crate::oauth::code::AuthorizationCode;
use crate::storage::{
    AuthorizationCodeStorage, AuthorizeSessionStorage, ClientStorage, StoredToken, TokenStorage,
    UserStorage,
};
use crate::types::{Client, User};

// =============================================================================
// Clients
// =============================================================================

/// Client registry keyed by client_id.
#[derive(Debug, Default)]
pub struct InMemoryClientStorage {
    clients: DashMap<String, Client>,
}

impl InMemoryClientStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStorage for InMemoryClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, client: &Client) -> AuthResult<Client> {
        client
            .validate()
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;

        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(_) => Err(AuthError::invalid_request(format!(
                "Client '{}' already exists",
                client.client_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                Ok(client.clone())
            }
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// User registry keyed by username.
#[derive(Debug, Default)]
pub struct InMemoryUserStorage {
    users: DashMap<String, User>,
}

impl InMemoryUserStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }

    async fn create(&self, user: &User) -> AuthResult<User> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AuthError::invalid_request(format!(
                "User '{}' already exists",
                user.username
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user.clone())
            }
        }
    }
}

// =============================================================================
// Authorize Sessions
// =============================================================================

/// Authorize sessions keyed by session id.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizeSessionStorage {
    sessions: DashMap<Uuid, AuthorizeSession>,
}

impl InMemoryAuthorizeSessionStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizeSessionStorage for InMemoryAuthorizeSessionStorage {
    async fn create(&self, session: &AuthorizeSession) -> AuthResult<()> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<AuthorizeSession>> {
        Ok(self
            .sessions
            .get(&id)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value().clone()))
    }

    async fn update(&self, session: &AuthorizeSession) -> AuthResult<()> {
        match self.sessions.get_mut(&session.id) {
            Some(mut entry) => {
                *entry = session.clone();
                Ok(())
            }
            None => Err(AuthError::storage("Authorize session not found")),
        }
    }

    async fn take(&self, id: Uuid) -> AuthResult<Option<AuthorizeSession>> {
        Ok(self
            .sessions
            .remove(&id)
            .map(|(_, session)| session)
            .filter(|session| !session.is_expired()))
    }

    async fn delete(&self, id: Uuid) -> AuthResult<()> {
        self.sessions.remove(&id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired());
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}

// =============================================================================
// Authorization Codes
// =============================================================================

/// Authorization codes keyed by code value.
#[derive(Debug, Default)]
pub struct InMemoryCodeStorage {
    codes: DashMap<String, AuthorizationCode>,
}

impl InMemoryCodeStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationCodeStorage for InMemoryCodeStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self.codes.remove(code).map(|(_, record)| record))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let before = self.codes.len();
        self.codes.retain(|_, code| !code.is_expired());
        Ok(before.saturating_sub(self.codes.len()) as u64)
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// Issued access and refresh tokens keyed by token value.
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    tokens: DashMap<String, StoredToken>,
}

impl InMemoryTokenStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn store(&self, token: &str, record: &StoredToken) -> AuthResult<()> {
        self.tokens.insert(token.to_string(), record.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> AuthResult<Option<StoredToken>> {
        Ok(self.tokens.get(token).map(|entry| entry.value().clone()))
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let before = self.tokens.len();
        self.tokens.retain(|_, record| !record.is_expired());
        Ok(before.saturating_sub(self.tokens.len()) as u64)
    }
}
