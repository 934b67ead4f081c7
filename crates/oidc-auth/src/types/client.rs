//! OAuth 2.0 client registrations.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types accepted at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow with PKCE.
    AuthorizationCode,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a grant_type parameter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth client. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Hex-encoded SHA-256 digest of the client secret (confidential clients).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_hash: Option<String>,

    /// Human-readable display name shown on the consent prompt.
    pub name: String,

    /// Exact redirect URIs this client may use.
    pub redirect_uris: Vec<String>,

    /// Grant types this client may use at the token endpoint.
    pub grant_types: Vec<GrantType>,

    /// Confidential clients must authenticate with their secret.
    /// Public clients present only `client_id` and rely on PKCE.
    pub confidential: bool,

    /// Inactive clients are rejected everywhere.
    pub active: bool,
}

impl Client {
    /// Registers a confidential client, hashing its plaintext secret.
    #[must_use]
    pub fn confidential(
        client_id: impl Into<String>,
        secret: &str,
        name: impl Into<String>,
        redirect_uris: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret_hash: Some(Self::hash_secret(secret)),
            name: name.into(),
            redirect_uris,
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            confidential: true,
            active: true,
        }
    }

    /// Registers a public client.
    #[must_use]
    pub fn public(
        client_id: impl Into<String>,
        name: impl Into<String>,
        redirect_uris: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret_hash: None,
            name: name.into(),
            redirect_uris,
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            confidential: false,
            active: true,
        }
    }

    /// Hex-encoded SHA-256 of a plaintext secret, as stored in `client_secret_hash`.
    #[must_use]
    pub fn hash_secret(secret: &str) -> String {
        hex::encode(Sha256::digest(secret.as_bytes()))
    }

    /// Compares a presented secret against the stored digest in constant time.
    #[must_use]
    pub fn verify_secret(&self, secret: &str) -> bool {
        let Some(stored) = self.client_secret_hash.as_deref() else {
            return false;
        };
        let presented = Self::hash_secret(secret);
        presented.as_bytes().ct_eq(stored.as_bytes()).into()
    }

    /// Validates the client registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is incomplete or inconsistent.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        if self.confidential && self.client_secret_hash.is_none() {
            return Err(ClientValidationError::MissingSecret);
        }

        if self.grant_types.contains(&GrantType::AuthorizationCode) && self.redirect_uris.is_empty()
        {
            return Err(ClientValidationError::NoRedirectUris);
        }

        for uri in &self.redirect_uris {
            if url::Url::parse(uri).is_err() {
                return Err(ClientValidationError::InvalidRedirectUri(uri.clone()));
            }
        }

        Ok(())
    }

    /// Exact-match check against the registered redirect URIs.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }
}

/// Client registration validation errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClientValidationError {
    /// Client ID is empty.
    #[error("client_id cannot be empty")]
    EmptyClientId,

    /// No grant types configured.
    #[error("at least one grant type is required")]
    NoGrantTypes,

    /// Confidential client without a secret.
    #[error("confidential clients must have a client secret")]
    MissingSecret,

    /// Authorization code flow without redirect URIs.
    #[error("authorization_code grant requires at least one redirect URI")]
    NoRedirectUris,

    /// Redirect URI is not an absolute URL.
    #[error("redirect URI is not a valid absolute URL: {0}")]
    InvalidRedirectUri(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> Client {
        Client::confidential(
            "app",
            "s3cret",
            "Demo App",
            vec!["https://app.example.com/callback".to_string()],
        )
    }

    #[test]
    fn test_secret_verification() {
        let client = app();
        assert!(client.verify_secret("s3cret"));
        assert!(!client.verify_secret("wrong"));
        assert!(!client.verify_secret(""));
        assert_eq!(
            client.client_secret_hash.as_deref().map(str::len),
            Some(64)
        );
    }

    #[test]
    fn test_public_client_never_verifies_secret() {
        let client = Client::public("spa", "SPA", vec!["https://spa.example.com/cb".to_string()]);
        assert!(!client.verify_secret("anything"));
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_redirect_uri_exact_match() {
        let client = app();
        assert!(client.is_redirect_uri_allowed("https://app.example.com/callback"));
        assert!(!client.is_redirect_uri_allowed("https://app.example.com/callback/"));
        assert!(!client.is_redirect_uri_allowed("https://app.example.com/callback?x=1"));
        assert!(!client.is_redirect_uri_allowed("https://evil.example.com/callback"));
    }

    #[test]
    fn test_validation() {
        assert!(app().validate().is_ok());

        let mut client = app();
        client.client_secret_hash = None;
        assert_eq!(client.validate(), Err(ClientValidationError::MissingSecret));

        let mut client = app();
        client.redirect_uris.clear();
        assert_eq!(client.validate(), Err(ClientValidationError::NoRedirectUris));

        let mut client = app();
        client.redirect_uris = vec!["not a url".to_string()];
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::InvalidRedirectUri(_))
        ));
    }

    #[test]
    fn test_grant_type_parse() {
        assert_eq!(
            GrantType::parse("authorization_code"),
            Some(GrantType::AuthorizationCode)
        );
        assert_eq!(GrantType::parse("refresh_token"), Some(GrantType::RefreshToken));
        assert_eq!(GrantType::parse("password"), None);
        assert!(app().is_grant_type_allowed(GrantType::RefreshToken));
    }
}
