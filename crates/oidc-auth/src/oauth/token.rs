//! Token endpoint types.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Exchange an authorization code for tokens
//! - `refresh_token` - Mint a new access token from a refresh token

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;

/// Token request parameters (form-encoded body of `/token` and `/token/refresh`).
///
/// Different fields are required depending on the `grant_type`:
///
/// - `authorization_code`: code, code_verifier, client_id, (optional) redirect_uri
/// - `refresh_token`: refresh_token
///
/// Clients authenticate with an HTTP Basic header (not in this struct),
/// `client_id` + `client_secret` in the body, or `client_id` alone when public.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type. Implied by the path on `/token/refresh`.
    #[serde(default)]
    pub grant_type: Option<String>,

    /// Authorization code (for authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI; when sent it must match the one the code was issued for.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (for authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID (for public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (for refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "openid profile",
///   "refresh_token": "eyJhbG...",
///   "id_token": "eyJhbG..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (JWT).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Refresh token (authorization_code grant only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token (authorization_code grant only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Creates a new token response with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope,
            refresh_token: None,
            id_token: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }

    /// Sets the ID token.
    #[must_use]
    pub fn with_id_token(mut self, token: String) -> Self {
        self.id_token = Some(token);
        self
    }
}

/// Token error response.
///
/// # Example Response
///
/// ```json
/// {
///   "error": "invalid_grant",
///   "error_description": "Authorization code expired"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenError {
    /// OAuth 2.0 error code.
    pub error: TokenErrorCode,

    /// Human-readable error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenError {
    /// Creates a new token error.
    #[must_use]
    pub fn new(error: TokenErrorCode) -> Self {
        Self {
            error,
            error_description: None,
        }
    }

    /// Creates a new token error with description.
    #[must_use]
    pub fn with_description(error: TokenErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }

    /// Creates an invalid_request error.
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidRequest, description)
    }

    /// Creates an invalid_client error.
    #[must_use]
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidClient, description)
    }

    /// Creates an invalid_grant error.
    #[must_use]
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidGrant, description)
    }

    /// Creates an unsupported_grant_type error.
    #[must_use]
    pub fn unsupported_grant_type(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::UnsupportedGrantType, description)
    }
}

impl From<&AuthError> for TokenError {
    fn from(error: &AuthError) -> Self {
        let code = match error {
            AuthError::InvalidClient { .. } => TokenErrorCode::InvalidClient,
            AuthError::InvalidGrant { .. } => TokenErrorCode::InvalidGrant,
            AuthError::InvalidRequest { .. } => TokenErrorCode::InvalidRequest,
            AuthError::InvalidTokenType { .. } => TokenErrorCode::InvalidTokenType,
            AuthError::TokenDecode(_)
            | AuthError::MissingToken
            | AuthError::InvalidToken { .. }
            | AuthError::Unauthorized { .. } => TokenErrorCode::InvalidToken,
            AuthError::UnsupportedGrantType { .. } => TokenErrorCode::UnsupportedGrantType,
            AuthError::UnsupportedResponseType { .. } => TokenErrorCode::InvalidRequest,
            AuthError::Storage { .. }
            | AuthError::Configuration { .. }
            | AuthError::Internal { .. } => TokenErrorCode::ServerError,
        };

        // Infrastructure details stay in the logs.
        let description = if code == TokenErrorCode::ServerError {
            "Internal server error".to_string()
        } else {
            error.to_string()
        };

        Self::with_description(code, description)
    }
}

/// OAuth 2.0 token error codes.
///
/// RFC 6749 Section 5.2 plus `invalid_token_type` and `invalid_token` for
/// refresh tokens that fail type checks or decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// The request is malformed or failed PKCE verification.
    InvalidRequest,

    /// Client authentication failed.
    InvalidClient,

    /// The authorization code or refresh token is invalid, expired,
    /// consumed, or was issued to another client.
    InvalidGrant,

    /// The grant type is not supported.
    UnsupportedGrantType,

    /// A token of the wrong type was presented.
    InvalidTokenType,

    /// The presented token could not be decoded.
    InvalidToken,

    /// Unexpected server condition.
    ServerError,
}

impl TokenErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidTokenType => "invalid_token_type",
            Self::InvalidToken => "invalid_token",
            Self::ServerError => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient | Self::InvalidToken => 401,
            Self::InvalidRequest
            | Self::InvalidGrant
            | Self::UnsupportedGrantType
            | Self::InvalidTokenType => 400,
            Self::ServerError => 500,
        }
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::jwt::JwtError;

    #[test]
    fn test_token_request_deserialization() {
        let json = r#"{
            "grant_type": "authorization_code",
            "code": "SplxlOBeZQQYbYS6WxSbIA",
            "redirect_uri": "https://app.example.com/callback",
            "code_verifier": "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk",
            "client_id": "my-app"
        }"#;

        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.grant_type.as_deref(), Some("authorization_code"));
        assert_eq!(request.code.as_deref(), Some("SplxlOBeZQQYbYS6WxSbIA"));
        assert_eq!(
            request.code_verifier.as_deref(),
            Some("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk")
        );
        assert_eq!(request.client_id.as_deref(), Some("my-app"));
        assert!(request.client_secret.is_none());
        assert!(request.refresh_token.is_none());
    }

    #[test]
    fn test_token_request_refresh_without_grant_type() {
        let json = r#"{"refresh_token": "tGzv3JOkF0XG5Qx2TlKWIA", "client_id": "my-app"}"#;
        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert!(request.grant_type.is_none());
        assert_eq!(request.refresh_token.as_deref(), Some("tGzv3JOkF0XG5Qx2TlKWIA"));
    }

    #[test]
    fn test_token_response_serialization() {
        let response = TokenResponse::new("at".to_string(), 1800, "openid".to_string());

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""access_token":"at""#));
        assert!(json.contains(r#""token_type":"Bearer""#));
        assert!(json.contains(r#""expires_in":1800"#));
        assert!(json.contains(r#""scope":"openid""#));
        assert!(!json.contains(r#""refresh_token":"#));
        assert!(!json.contains(r#""id_token":"#));
    }

    #[test]
    fn test_token_response_with_all_fields() {
        let response = TokenResponse::new("at".to_string(), 3600, "openid".to_string())
            .with_refresh_token("rt".to_string())
            .with_id_token("it".to_string());

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""refresh_token":"rt""#));
        assert!(json.contains(r#""id_token":"it""#));
    }

    #[test]
    fn test_token_error_serialization() {
        let error = TokenError::invalid_grant("Authorization code expired");

        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""error":"invalid_grant""#));
        assert!(json.contains(r#""error_description":"Authorization code expired""#));

        let json = serde_json::to_string(&TokenError::new(TokenErrorCode::InvalidClient)).unwrap();
        assert!(!json.contains("error_description"));
    }

    #[test]
    fn test_from_auth_error() {
        let error = TokenError::from(&AuthError::invalid_client("Unknown client"));
        assert_eq!(error.error, TokenErrorCode::InvalidClient);
        assert_eq!(error.error.http_status(), 401);

        let error = TokenError::from(&AuthError::invalid_token_type("refresh", "access"));
        assert_eq!(error.error, TokenErrorCode::InvalidTokenType);
        assert_eq!(error.error.http_status(), 400);

        let error = TokenError::from(&AuthError::TokenDecode(JwtError::Expired));
        assert_eq!(error.error, TokenErrorCode::InvalidToken);
        assert_eq!(error.error.http_status(), 401);

        let error = TokenError::from(&AuthError::storage("connection refused"));
        assert_eq!(error.error, TokenErrorCode::ServerError);
        assert_eq!(error.error_description.as_deref(), Some("Internal server error"));
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(TokenErrorCode::InvalidRequest.http_status(), 400);
        assert_eq!(TokenErrorCode::InvalidClient.http_status(), 401);
        assert_eq!(TokenErrorCode::InvalidGrant.http_status(), 400);
        assert_eq!(TokenErrorCode::UnsupportedGrantType.http_status(), 400);
        assert_eq!(TokenErrorCode::ServerError.http_status(), 500);
    }
}
