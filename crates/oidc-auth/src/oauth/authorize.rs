//! Authorization endpoint types.
//!
//! # Authorization Code Flow
//!
//! 1. Client redirects the user to `/authorize` with request parameters
//! 2. User logs in and consents
//! 3. Server redirects back to the client with an authorization code
//! 4. Client exchanges the code for tokens at `/token`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization request parameters, received as query string on `GET /authorize`.
///
/// # Example
///
/// ```ignore
/// GET /authorize?
///   response_type=code
///   &client_id=my-app
///   &redirect_uri=https://app.example.com/callback
///   &scope=openid profile
///   &state=abc123xyz
///   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
///   &code_challenge_method=S256
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code".
    #[serde(default)]
    pub response_type: Option<String>,

    /// Client identifier issued during registration.
    #[serde(default)]
    pub client_id: String,

    /// Must exactly match one of the client's registered redirect URIs.
    #[serde(default)]
    pub redirect_uri: String,

    /// Requested scopes (space-separated).
    #[serde(default)]
    pub scope: Option<String>,

    /// Opaque value echoed back on the redirect.
    #[serde(default)]
    pub state: Option<String>,

    /// PKCE code challenge.
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method; absent means `plain`.
    #[serde(default)]
    pub code_challenge_method: Option<String>,
}

/// Successful authorization response, delivered as query parameters on the redirect.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Single-use authorization code.
    pub code: String,

    /// Echoed state parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: String, state: Option<String>) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL, keeping any query the registered URI already has.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// Authorization error delivered to the client via redirect.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationError {
    /// OAuth 2.0 error code.
    pub error: AuthorizationErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Echoed state parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationError {
    /// Creates a new authorization error.
    #[must_use]
    pub fn new(error: AuthorizationErrorCode, state: Option<String>) -> Self {
        Self {
            error,
            error_description: None,
            state,
        }
    }

    /// Adds a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    /// Builds the redirect URL with error parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            if let Some(ref desc) = self.error_description {
                pairs.append_pair("error_description", desc);
            }
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// OAuth 2.0 authorization error codes (RFC 6749 Section 4.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The request is malformed.
    InvalidRequest,

    /// The resource owner denied the request.
    AccessDenied,

    /// Only `code` is supported.
    UnsupportedResponseType,

    /// Unexpected server condition.
    ServerError,
}

impl AuthorizationErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
