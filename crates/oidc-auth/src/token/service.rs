//! Token minting and decoding.
//!
//! `TokenService` turns a subject into signed ID, access and refresh tokens
//! and decodes them back. It knows nothing about storage; the flow controller
//! decides what gets recorded.

use std::sync::Arc;

use time::Duration;

use crate::config::AuthConfig;
use crate::token::jwt::{JwtError, JwtService, TokenClaims, TokenType};

/// Lifetimes applied when minting tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// ID token lifetime.
    pub id_token_lifetime: Duration,

    /// Access token lifetime for the authorization code grant.
    pub access_token_lifetime: Duration,

    /// Access token lifetime when minted from a refresh token.
    pub refreshed_access_token_lifetime: Duration,

    /// Refresh token lifetime.
    pub refresh_token_lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            id_token_lifetime: Duration::minutes(10),
            access_token_lifetime: Duration::hours(1),
            refreshed_access_token_lifetime: Duration::minutes(30),
            refresh_token_lifetime: Duration::days(30),
        }
    }
}

impl TokenConfig {
    /// Builds the token lifetimes from the auth configuration.
    #[must_use]
    pub fn from_auth_config(config: &AuthConfig) -> Self {
        Self {
            id_token_lifetime: to_duration(config.oauth.id_token_lifetime),
            access_token_lifetime: to_duration(config.oauth.access_token_lifetime),
            refreshed_access_token_lifetime: to_duration(
                config.oauth.refreshed_access_token_lifetime,
            ),
            refresh_token_lifetime: to_duration(config.oauth.refresh_token_lifetime),
        }
    }
}

fn to_duration(value: std::time::Duration) -> Duration {
    Duration::try_from(value).unwrap_or(Duration::MAX)
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The compact JWT.
    pub token: String,
    /// The claims that were signed.
    pub claims: TokenClaims,
}

impl IssuedToken {
    /// Seconds until this token expires, as reported in `expires_in`.
    #[must_use]
    pub fn expires_in(&self) -> u64 {
        u64::try_from(self.claims.exp - self.claims.iat).unwrap_or(0)
    }
}

/// Mints and decodes ID, access and refresh tokens.
pub struct TokenService {
    jwt_service: Arc<JwtService>,
    config: TokenConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(jwt_service: Arc<JwtService>, config: TokenConfig) -> Self {
        Self {
            jwt_service,
            config,
        }
    }

    /// Mints an ID token asserting `subject` to `audience` (the client ID).
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn generate_id_token(
        &self,
        subject: &str,
        audience: &str,
    ) -> Result<IssuedToken, JwtError> {
        let claims = TokenClaims::builder(self.jwt_service.issuer(), subject, TokenType::Id)
            .audience(audience)
            .expires_in_seconds(self.config.id_token_lifetime.whole_seconds())
            .build();
        self.sign(claims)
    }

    /// Mints an access token for the authorization code grant.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn generate_access_token(
        &self,
        subject: &str,
        scope: &str,
        client_id: &str,
    ) -> Result<IssuedToken, JwtError> {
        self.access_token(subject, scope, client_id, self.config.access_token_lifetime)
    }

    /// Mints an access token in exchange for a refresh token.
    ///
    /// Uses the shorter refreshed-token lifetime.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn generate_refreshed_access_token(
        &self,
        subject: &str,
        scope: &str,
        client_id: &str,
    ) -> Result<IssuedToken, JwtError> {
        self.access_token(
            subject,
            scope,
            client_id,
            self.config.refreshed_access_token_lifetime,
        )
    }

    /// Mints a refresh token. The granted scope rides along so a refresh
    /// can reproduce it.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn generate_refresh_token(
        &self,
        subject: &str,
        scope: &str,
        client_id: &str,
    ) -> Result<IssuedToken, JwtError> {
        let claims = TokenClaims::builder(self.jwt_service.issuer(), subject, TokenType::Refresh)
            .scope(scope)
            .client_id(client_id)
            .expires_in_seconds(self.config.refresh_token_lifetime.whole_seconds())
            .build();
        self.sign(claims)
    }

    /// Verifies signature, issuer and expiry, returning the claims.
    ///
    /// # Errors
    /// Returns `Expired`, `InvalidSignature` or `Malformed` as distinct causes.
    pub fn decode_token(&self, token: &str) -> Result<TokenClaims, JwtError> {
        self.jwt_service
            .decode::<TokenClaims>(token)
            .map(|data| data.claims)
    }

    /// Returns the underlying JWT service.
    #[must_use]
    pub fn jwt_service(&self) -> &Arc<JwtService> {
        &self.jwt_service
    }

    /// Returns the token configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    fn access_token(
        &self,
        subject: &str,
        scope: &str,
        client_id: &str,
        lifetime: Duration,
    ) -> Result<IssuedToken, JwtError> {
        let claims = TokenClaims::builder(self.jwt_service.issuer(), subject, TokenType::Access)
            .scope(scope)
            .client_id(client_id)
            .expires_in_seconds(lifetime.whole_seconds())
            .build();
        self.sign(claims)
    }

    fn sign(&self, claims: TokenClaims) -> Result<IssuedToken, JwtError> {
        let token = self.jwt_service.encode(&claims)?;
        Ok(IssuedToken { token, claims })
    }
}
