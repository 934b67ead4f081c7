//! Authentication and authorization error types.
//!
//! Every failure of the authorization code flow surfaces as an [`AuthError`]
//! with a stable OAuth-style error code. No failure is fatal to the process.

use std::fmt;

use crate::token::jwt::JwtError;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client credentials are invalid or the client is not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The resource owner could not be authenticated.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The authorization code is unknown, expired, consumed, or bound elsewhere.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The request is malformed or failed PKCE verification.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// A token of the wrong type was presented.
    #[error("Invalid token type: expected {expected}, got {actual}")]
    InvalidTokenType {
        /// The token type the endpoint accepts.
        expected: String,
        /// The token type that was presented.
        actual: String,
    },

    /// The token could not be decoded (expired, malformed, or bad signature).
    #[error("Token decode failed: {0}")]
    TokenDecode(#[from] JwtError),

    /// No bearer credential was supplied.
    #[error("Missing token")]
    MissingToken,

    /// The bearer credential is not recognized.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The authorization server does not support the requested response type.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The unsupported response type.
        response_type: String,
    },

    /// The authorization server does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidTokenType` error.
    #[must_use]
    pub fn invalid_token_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidTokenType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is an authentication error.
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidClient { .. } | Self::Unauthorized { .. } | Self::TokenDecode(_)
        )
    }

    /// Returns `true` if this is a token-related error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTokenType { .. }
                | Self::TokenDecode(_)
                | Self::MissingToken
                | Self::InvalidToken { .. }
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClient { .. } => ErrorCategory::Authentication,
            Self::Unauthorized { .. } => ErrorCategory::Authentication,
            Self::InvalidGrant { .. } => ErrorCategory::Grant,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::InvalidTokenType { .. } => ErrorCategory::Token,
            Self::TokenDecode(_) => ErrorCategory::Token,
            Self::MissingToken => ErrorCategory::Token,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::UnsupportedResponseType { .. } => ErrorCategory::Validation,
            Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidClient { .. } => "invalid_client",
            Self::Unauthorized { .. } => "unauthorized",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidTokenType { .. } => "invalid_token_type",
            Self::TokenDecode(_) => "invalid_token",
            Self::MissingToken => "invalid_token",
            Self::InvalidToken { .. } => "invalid_token",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::Storage { .. } => "server_error",
            Self::Configuration { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }
}

/// Categories of authentication/authorization errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client or resource owner authentication failed.
    Authentication,
    /// Authorization code redemption failed.
    Grant,
    /// Token decoding, typing, or lookup failed.
    Token,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Grant => write!(f, "grant"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_client("client not found");
        assert_eq!(err.to_string(), "Invalid client: client not found");

        let err = AuthError::invalid_grant("authorization code not found");
        assert_eq!(err.to_string(), "Invalid grant: authorization code not found");

        let err = AuthError::invalid_token_type("refresh", "access");
        assert_eq!(
            err.to_string(),
            "Invalid token type: expected refresh, got access"
        );

        let err = AuthError::from(JwtError::Expired);
        assert_eq!(err.to_string(), "Token decode failed: Token expired");

        assert_eq!(AuthError::MissingToken.to_string(), "Missing token");
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::invalid_client("test");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert!(err.is_authentication_error());
        assert!(!err.is_token_error());

        let err = AuthError::TokenDecode(JwtError::InvalidSignature);
        assert!(err.is_client_error());
        assert!(err.is_authentication_error());
        assert!(err.is_token_error());

        let err = AuthError::MissingToken;
        assert!(err.is_token_error());
        assert!(!err.is_authentication_error());

        let err = AuthError::storage("store unavailable");
        assert!(!err.is_client_error());
        assert!(err.is_server_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_client("test").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::invalid_grant("test").category(),
            ErrorCategory::Grant
        );
        assert_eq!(
            AuthError::unsupported_grant_type("password").category(),
            ErrorCategory::Validation
        );
        assert_eq!(AuthError::MissingToken.category(), ErrorCategory::Token);
        assert_eq!(
            AuthError::storage("test").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            AuthError::configuration("test").category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_oauth_error_code() {
        assert_eq!(
            AuthError::invalid_client("test").oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::invalid_grant("test").oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::invalid_request("PKCE verification failed").oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(
            AuthError::invalid_token_type("refresh", "access").oauth_error_code(),
            "invalid_token_type"
        );
        assert_eq!(
            AuthError::TokenDecode(JwtError::Expired).oauth_error_code(),
            "invalid_token"
        );
        assert_eq!(
            AuthError::unsupported_grant_type("password").oauth_error_code(),
            "unsupported_grant_type"
        );
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Authentication.to_string(), "authentication");
        assert_eq!(ErrorCategory::Grant.to_string(), "grant");
        assert_eq!(ErrorCategory::Token.to_string(), "token");
    }
}
