//! Client authentication for the token endpoint.
//!
//! # Authentication Methods
//!
//! - `none` - Public clients (client_id only, relying on PKCE)
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in request body
//!
//! # Authentication Priority
//!
//! When multiple methods are present they are tried in order:
//! 1. HTTP Basic Auth header
//! 2. client_secret_post (body parameters)
//! 3. Public client (client_id only)

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::ClientStorage;
use crate::types::Client;

/// Result of successful client authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// The authenticated client.
    pub client: Client,

    /// The authentication method used.
    pub auth_method: TokenEndpointAuthMethod,
}

/// Token endpoint authentication methods (OpenID Connect Core Section 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// No client authentication (public clients).
    None,

    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,

    /// Client secret in request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    /// Returns the string representation of the auth method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

impl fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client credentials as presented on a token request.
#[derive(Clone, Default)]
pub struct ClientCredentials {
    /// Decoded HTTP Basic credentials.
    pub basic: Option<(String, String)>,

    /// `client_id` form field.
    pub client_id: Option<String>,

    /// `client_secret` form field.
    pub client_secret: Option<String>,
}

impl ClientCredentials {
    /// Collects credentials from an `Authorization` header and form fields.
    ///
    /// A header that is not valid Basic auth is ignored.
    #[must_use]
    pub fn from_request(
        authorization: Option<&str>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            basic: authorization.and_then(parse_basic_auth),
            client_id: client_id.filter(|s| !s.is_empty()),
            client_secret: client_secret.filter(|s| !s.is_empty()),
        }
    }

    /// The client_id the caller claims, preferring the Basic header.
    #[must_use]
    pub fn claimed_client_id(&self) -> Option<&str> {
        self.basic
            .as_ref()
            .map(|(id, _)| id.as_str())
            .or(self.client_id.as_deref())
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("basic", &self.basic.as_ref().map(|(id, _)| (id, "[REDACTED]")))
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Authenticates a client from presented credentials.
///
/// # Errors
///
/// Returns `invalid_client` if:
/// - No client credentials are provided
/// - The client is not found or inactive
/// - The client secret is invalid
/// - A confidential client omits its secret
/// - A public client presents a secret
pub async fn authenticate_client(
    credentials: &ClientCredentials,
    client_storage: &dyn ClientStorage,
) -> AuthResult<AuthenticatedClient> {
    if let Some((client_id, client_secret)) = &credentials.basic {
        return authenticate_with_secret(
            client_id,
            client_secret,
            TokenEndpointAuthMethod::ClientSecretBasic,
            client_storage,
        )
        .await;
    }

    if let (Some(client_id), Some(client_secret)) =
        (&credentials.client_id, &credentials.client_secret)
    {
        return authenticate_with_secret(
            client_id,
            client_secret,
            TokenEndpointAuthMethod::ClientSecretPost,
            client_storage,
        )
        .await;
    }

    if let Some(client_id) = &credentials.client_id {
        return authenticate_public(client_id, client_storage).await;
    }

    Err(AuthError::invalid_client("No client credentials provided"))
}

async fn find_active(client_id: &str, client_storage: &dyn ClientStorage) -> AuthResult<Client> {
    let client = client_storage
        .find_by_client_id(client_id)
        .await?
        .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

    if !client.active {
        return Err(AuthError::invalid_client("Client is inactive"));
    }

    Ok(client)
}

async fn authenticate_with_secret(
    client_id: &str,
    client_secret: &str,
    method: TokenEndpointAuthMethod,
    client_storage: &dyn ClientStorage,
) -> AuthResult<AuthenticatedClient> {
    let client = find_active(client_id, client_storage).await?;

    if !client.confidential {
        return Err(AuthError::invalid_client(format!(
            "Public clients cannot use {method} authentication"
        )));
    }

    if !client.verify_secret(client_secret) {
        return Err(AuthError::invalid_client("Invalid client secret"));
    }

    Ok(AuthenticatedClient {
        client,
        auth_method: method,
    })
}

async fn authenticate_public(
    client_id: &str,
    client_storage: &dyn ClientStorage,
) -> AuthResult<AuthenticatedClient> {
    let client = find_active(client_id, client_storage).await?;

    if client.confidential {
        return Err(AuthError::invalid_client(
            "Confidential clients must provide client credentials",
        ));
    }

    Ok(AuthenticatedClient {
        client,
        auth_method: TokenEndpointAuthMethod::None,
    })
}

/// Parses an HTTP Basic Authorization header into (client_id, client_secret).
///
/// The scheme is matched case-insensitively. The secret may contain colons.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    let header_value = header_value.trim();
    let (scheme, encoded) = header_value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (client_id, client_secret) = credentials.split_once(':')?;

    Some((client_id.to_string(), client_secret.to_string()))
}
