//! Client storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

/// Storage operations for OAuth 2.0 clients.
///
/// # Example
///
/// ```ignore
/// use oidc_auth::storage::ClientStorage;
///
/// async fn example(storage: &dyn ClientStorage) {
///     if let Some(client) = storage.find_by_client_id("my-app").await? {
///         println!("Found client: {}", client.name);
///     }
/// }
/// ```
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Find a client by its OAuth client_id.
    ///
    /// Returns `None` if the client doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Register a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client fails validation or the client_id is taken.
    async fn create(&self, client: &Client) -> AuthResult<Client>;
}
