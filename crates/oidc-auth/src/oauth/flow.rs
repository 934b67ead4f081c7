//! Authorization code flow controller.
//!
//! [`AuthorizationFlow`] drives one login from the authorization request to
//! the token exchange, plus refresh and userinfo lookups:
//!
//! ```text
//! begin ─▶ AwaitingCredentials ─authenticate─▶ AwaitingConsent ─consent─▶ CodeIssued
//!              │                                                            │
//!              └─▶ Unauthorized                              exchange_code ─┴─▶ Exchanged
//!                                                                           └─▶ Replayed / Expired
//! ```
//!
//! # Security
//!
//! - Codes are consumed atomically before any check, so a failed PKCE check
//!   still burns the code and two concurrent redemptions cannot both succeed
//! - A code is redeemable only by the client it was issued to
//! - Refresh tokens are type-checked at decode time and bound to their client
//! - Codes, tokens, secrets and passwords are never logged

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
};
use crate::oauth::authorize_session::{AuthorizeSession, SessionUser};
use crate::oauth::client_auth::{ClientCredentials, authenticate_client};
use crate::oauth::code::AuthorizationCode;
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod, verify_pkce};
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::storage::{
    AuthorizationCodeStorage, AuthorizeSessionStorage, ClientStorage, InMemoryAuthorizeSessionStorage,
    InMemoryClientStorage, InMemoryCodeStorage, InMemoryTokenStorage, InMemoryUserStorage,
    StoredToken, TokenStorage, UserStorage,
};
use crate::token::{IssuedToken, JwtError, TokenService, TokenType};
use crate::types::{Client, GrantType, UserInfo};

// =============================================================================
// Configuration
// =============================================================================

/// Lifetimes of flow state held server-side.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Authorization code lifetime in seconds.
    pub code_lifetime_secs: i64,

    /// Authorize session lifetime in seconds.
    pub session_lifetime_secs: i64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            code_lifetime_secs: crate::oauth::code::DEFAULT_CODE_EXPIRY_SECS,
            session_lifetime_secs: crate::oauth::authorize_session::DEFAULT_SESSION_EXPIRY_SECS,
        }
    }
}

impl FlowConfig {
    /// Reads lifetimes from the auth configuration.
    #[must_use]
    pub fn from_auth_config(config: &AuthConfig) -> Self {
        Self {
            code_lifetime_secs: secs(config.oauth.authorization_code_lifetime),
            session_lifetime_secs: secs(config.oauth.authorize_session_lifetime),
        }
    }
}

fn secs(value: std::time::Duration) -> i64 {
    i64::try_from(value.as_secs()).unwrap_or(i64::MAX)
}

/// The stores a flow reads and writes.
#[derive(Clone)]
pub struct FlowStores {
    /// Registered clients.
    pub clients: Arc<dyn ClientStorage>,
    /// Registered users.
    pub users: Arc<dyn UserStorage>,
    /// In-flight authorize sessions.
    pub sessions: Arc<dyn AuthorizeSessionStorage>,
    /// Issued authorization codes.
    pub codes: Arc<dyn AuthorizationCodeStorage>,
    /// Issued access and refresh tokens.
    pub tokens: Arc<dyn TokenStorage>,
}

impl FlowStores {
    /// Empty `DashMap`-backed stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            clients: Arc::new(InMemoryClientStorage::new()),
            users: Arc::new(InMemoryUserStorage::new()),
            sessions: Arc::new(InMemoryAuthorizeSessionStorage::new()),
            codes: Arc::new(InMemoryCodeStorage::new()),
            tokens: Arc::new(InMemoryTokenStorage::new()),
        }
    }
}

// =============================================================================
// Flow Results
// =============================================================================

/// A session together with the client it belongs to, for rendering prompts.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    /// The in-flight session.
    pub session: AuthorizeSession,
    /// The requesting client.
    pub client: Client,
}

/// The resource owner's answer on the consent screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsentDecision {
    /// Issue a code.
    #[default]
    Approve,
    /// Redirect back with `access_denied`.
    Deny,
}

impl ConsentDecision {
    /// Parses the `decision` form field; absent means approve.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` for anything but "approve" or "deny".
    pub fn parse(value: Option<&str>) -> AuthResult<Self> {
        match value {
            None | Some("") | Some("approve") => Ok(Self::Approve),
            Some("deny") => Ok(Self::Deny),
            Some(other) => Err(AuthError::invalid_request(format!(
                "Unknown consent decision: {other}"
            ))),
        }
    }
}

/// Counts removed by one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Expired authorize sessions removed.
    pub sessions: u64,
    /// Expired authorization codes removed.
    pub codes: u64,
    /// Expired tokens removed.
    pub tokens: u64,
}

impl CleanupReport {
    /// Total records removed.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.sessions + self.codes + self.tokens
    }
}

// =============================================================================
// Flow Controller
// =============================================================================

/// Orchestrates the authorization code flow with PKCE.
pub struct AuthorizationFlow {
    stores: FlowStores,
    token_service: Arc<TokenService>,
    config: FlowConfig,
}

impl AuthorizationFlow {
    /// Creates a new flow controller.
    #[must_use]
    pub fn new(stores: FlowStores, token_service: Arc<TokenService>, config: FlowConfig) -> Self {
        Self {
            stores,
            token_service,
            config,
        }
    }

    /// Validates an authorization request and opens a session for it.
    ///
    /// # Errors
    ///
    /// - `unsupported_response_type` unless `response_type=code`
    /// - `invalid_client` for unknown or inactive clients
    /// - `invalid_request` for an unregistered redirect URI, a missing
    ///   `code_challenge` or an unsupported `code_challenge_method`
    pub async fn begin(&self, request: &AuthorizationRequest) -> AuthResult<PendingAuthorization> {
        match request.response_type.as_deref() {
            Some("code") => {}
            Some(other) => return Err(AuthError::unsupported_response_type(other)),
            None => return Err(AuthError::invalid_request("Missing response_type")),
        }

        if request.client_id.is_empty() {
            return Err(AuthError::invalid_request("Missing client_id"));
        }

        let client = self
            .stores
            .clients
            .find_by_client_id(&request.client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is inactive"));
        }

        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            tracing::warn!(client_id = %client.client_id, "Unregistered redirect_uri");
            return Err(AuthError::invalid_request("Invalid redirect_uri"));
        }

        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::invalid_request(
                "Client is not authorized for authorization_code grant",
            ));
        }

        let challenge = request
            .code_challenge
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing code_challenge"))?;

        let method = match request.code_challenge_method.as_deref() {
            None | Some("") => PkceChallengeMethod::default(),
            Some(method) => PkceChallengeMethod::parse(method)
                .map_err(|e| AuthError::invalid_request(e.to_string()))?,
        };

        let code_challenge = PkceChallenge::new(challenge, method)
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;

        let session = AuthorizeSession::new(
            client.client_id.clone(),
            request.redirect_uri.clone(),
            request.state.clone(),
            request.scope.clone().unwrap_or_default(),
            code_challenge,
            self.config.session_lifetime_secs,
        );
        self.stores.sessions.create(&session).await?;

        tracing::debug!(
            client_id = %client.client_id,
            pkce_method = %method,
            "Authorization request accepted"
        );

        Ok(PendingAuthorization { session, client })
    }

    /// Checks the user's credentials and binds the user to the session.
    ///
    /// A failed login ends the flow: the session is deleted.
    ///
    /// # Errors
    ///
    /// - `invalid_request` if the session is missing or expired
    /// - `unauthorized` on unknown user, inactive user or wrong password
    pub async fn authenticate(
        &self,
        session_id: Uuid,
        username: &str,
        password: &str,
    ) -> AuthResult<PendingAuthorization> {
        let mut session = self.live_session(session_id).await?;

        let user = self.stores.users.find_by_username(username).await?;
        let user = match user {
            Some(user) if user.active && user.check_password(password) => user,
            _ => {
                self.stores.sessions.delete(session_id).await?;
                tracing::warn!(client_id = %session.client_id, "Login failed");
                return Err(AuthError::unauthorized("Invalid username or password"));
            }
        };

        let client = self.session_client(&session).await?;

        session.bind_user(&user.username, &user.sub);
        self.stores.sessions.update(&session).await?;

        tracing::info!(client_id = %session.client_id, sub = %user.sub, "User authenticated");

        Ok(PendingAuthorization { session, client })
    }

    /// Records the consent decision and returns the redirect URL.
    ///
    /// Approval issues a code: `redirect_uri?code=...&state=...`. Denial
    /// yields `redirect_uri?error=access_denied&state=...`. The session is
    /// taken out of the store first, so it yields at most one redirect, and
    /// consent before login ends the flow.
    ///
    /// # Errors
    ///
    /// Returns `unauthorized` if no authenticated user is bound to the session.
    pub async fn consent(&self, session_id: Uuid, decision: ConsentDecision) -> AuthResult<String> {
        let session = self
            .stores
            .sessions
            .take(session_id)
            .await?
            .ok_or_else(|| AuthError::unauthorized("No authorization session"))?;

        let user = match (&session.user, session.is_authenticated()) {
            (Some(user), true) => user.clone(),
            _ => return Err(AuthError::unauthorized("User is not authenticated")),
        };

        let redirect = match decision {
            ConsentDecision::Approve => {
                let code = AuthorizationCode::issue(
                    session.client_id.clone(),
                    user.clone(),
                    session.redirect_uri.clone(),
                    session.scope.clone(),
                    session.code_challenge.clone(),
                    self.config.code_lifetime_secs,
                );
                self.stores.codes.create(&code).await?;

                tracing::info!(
                    client_id = %session.client_id,
                    sub = %user.sub,
                    "Authorization code issued"
                );

                AuthorizationResponse::new(code.code, session.state.clone())
                    .to_redirect_url(&session.redirect_uri)
            }
            ConsentDecision::Deny => {
                tracing::info!(
                    client_id = %session.client_id,
                    sub = %user.sub,
                    "Authorization denied by user"
                );

                AuthorizationError::new(AuthorizationErrorCode::AccessDenied, session.state.clone())
                    .to_redirect_url(&session.redirect_uri)
            }
        };

        redirect.map_err(|e| AuthError::internal(format!("Invalid stored redirect_uri: {e}")))
    }

    /// Redeems an authorization code for ID, access and refresh tokens.
    ///
    /// # Errors
    ///
    /// - Client authentication errors, verbatim
    /// - `invalid_grant` if the code is unknown, consumed, expired, issued
    ///   to another client or to another redirect URI
    /// - `invalid_request` on a missing code or a PKCE mismatch
    pub async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        request: &TokenRequest,
    ) -> AuthResult<TokenResponse> {
        let authenticated =
            authenticate_client(credentials, self.stores.clients.as_ref()).await?;
        let client = authenticated.client;

        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::invalid_grant(
                "Client is not authorized for authorization_code grant",
            ));
        }

        let code_value = request
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing code"))?;

        // Taken out of the store before any check: every attempt burns the code.
        let record = self
            .stores
            .codes
            .consume(code_value)
            .await?
            .ok_or_else(|| {
                tracing::warn!(client_id = %client.client_id, "Unknown or replayed authorization code");
                AuthError::invalid_grant("Invalid authorization code")
            })?;

        let supplied_client_id = request.client_id.as_deref().unwrap_or(&client.client_id);
        if record.client_id != supplied_client_id || record.client_id != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                "Authorization code presented by another client"
            );
            return Err(AuthError::invalid_grant("Invalid authorization code"));
        }

        if record.is_expired() {
            return Err(AuthError::invalid_grant("Authorization code expired"));
        }

        if let Some(redirect_uri) = request.redirect_uri.as_deref() {
            if redirect_uri != record.redirect_uri {
                return Err(AuthError::invalid_grant("redirect_uri mismatch"));
            }
        }

        if !verify_pkce(
            Some(record.code_challenge.as_str()),
            record.code_challenge.method().as_str(),
            request.code_verifier.as_deref(),
        ) {
            tracing::warn!(client_id = %client.client_id, "PKCE verification failed");
            return Err(AuthError::invalid_request("PKCE verification failed"));
        }

        let user = self
            .stores
            .users
            .find_by_username(&record.user.username)
            .await?
            .filter(|u| u.active && u.sub == record.user.sub)
            .ok_or_else(|| AuthError::invalid_grant("User no longer exists"))?;

        let tokens = &self.token_service;
        let id_token = tokens
            .generate_id_token(&user.sub, &client.client_id)
            .map_err(signing_failed)?;
        let access_token = tokens
            .generate_access_token(&user.sub, &record.scope, &client.client_id)
            .map_err(signing_failed)?;
        let refresh_token = tokens
            .generate_refresh_token(&user.sub, &record.scope, &client.client_id)
            .map_err(signing_failed)?;

        self.record(&access_token, &record.user, &client.client_id, &record.scope)
            .await?;
        self.record(&refresh_token, &record.user, &client.client_id, &record.scope)
            .await?;

        tracing::info!(
            client_id = %client.client_id,
            sub = %user.sub,
            auth_method = %authenticated.auth_method,
            "Tokens issued for authorization code"
        );

        Ok(
            TokenResponse::new(access_token.token.clone(), access_token.expires_in(), record.scope)
                .with_refresh_token(refresh_token.token)
                .with_id_token(id_token.token),
        )
    }

    /// Mints a new access token from a refresh token.
    ///
    /// # Errors
    ///
    /// - Client authentication errors, verbatim
    /// - `invalid_token` when the refresh token fails to decode
    ///   (expired, malformed, bad signature)
    /// - `invalid_token_type` when the token is not a refresh token
    /// - `invalid_grant` when the token is unknown or bound to another client
    pub async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        let authenticated =
            authenticate_client(credentials, self.stores.clients.as_ref()).await?;
        let client = authenticated.client;

        if !client.is_grant_type_allowed(GrantType::RefreshToken) {
            return Err(AuthError::invalid_grant(
                "Client is not authorized for refresh_token grant",
            ));
        }

        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing refresh_token"))?;

        let claims = self.token_service.decode_token(refresh_token).map_err(|e| {
            tracing::warn!(client_id = %client.client_id, error = %e, "Refresh token rejected");
            AuthError::TokenDecode(e)
        })?;

        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::invalid_token_type(
                TokenType::Refresh.as_str(),
                claims.token_type.as_str(),
            ));
        }

        let stored = self
            .stores
            .tokens
            .find(refresh_token)
            .await?
            .filter(|r| r.token_type == TokenType::Refresh && !r.is_expired())
            .ok_or_else(|| AuthError::invalid_grant("Unknown refresh token"))?;

        if stored.client_id != client.client_id || stored.user.sub != claims.sub {
            tracing::warn!(
                client_id = %client.client_id,
                "Refresh token presented by another client"
            );
            return Err(AuthError::invalid_grant("Unknown refresh token"));
        }

        let scope = claims.scope.unwrap_or(stored.scope);
        let access_token = self
            .token_service
            .generate_refreshed_access_token(&claims.sub, &scope, &client.client_id)
            .map_err(signing_failed)?;

        self.record(&access_token, &stored.user, &client.client_id, &scope)
            .await?;

        tracing::info!(client_id = %client.client_id, sub = %claims.sub, "Access token refreshed");

        Ok(TokenResponse::new(
            access_token.token.clone(),
            access_token.expires_in(),
            scope,
        ))
    }

    /// Resolves the user behind a bearer access token.
    ///
    /// Accepts the raw `Authorization` header value; a `Bearer` prefix is
    /// stripped case-insensitively.
    ///
    /// # Errors
    ///
    /// - `MissingToken` if no credential is presented
    /// - `InvalidToken` if the token is unknown, expired, not an access
    ///   token, or its user no longer exists
    pub async fn resolve_identity(&self, authorization: Option<&str>) -> AuthResult<UserInfo> {
        let token = authorization
            .map(strip_bearer)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let stored = self
            .stores
            .tokens
            .find(token)
            .await?
            .ok_or_else(|| AuthError::invalid_token("Unknown token"))?;

        if stored.token_type != TokenType::Access {
            return Err(AuthError::invalid_token("Not an access token"));
        }
        if stored.is_expired() {
            return Err(AuthError::invalid_token("Token expired"));
        }

        let user = self
            .stores
            .users
            .find_by_username(&stored.user.username)
            .await?
            .filter(|u| u.sub == stored.user.sub)
            .ok_or_else(|| AuthError::invalid_token("Token user no longer exists"))?;

        Ok(UserInfo::from(&user))
    }

    /// Deletes expired sessions, codes and tokens.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub async fn cleanup_expired(&self) -> AuthResult<CleanupReport> {
        Ok(CleanupReport {
            sessions: self.stores.sessions.cleanup_expired().await?,
            codes: self.stores.codes.cleanup_expired().await?,
            tokens: self.stores.tokens.cleanup_expired().await?,
        })
    }

    /// Returns the token service.
    #[must_use]
    pub fn token_service(&self) -> &Arc<TokenService> {
        &self.token_service
    }

    /// Returns the stores.
    #[must_use]
    pub fn stores(&self) -> &FlowStores {
        &self.stores
    }

    async fn live_session(&self, session_id: Uuid) -> AuthResult<AuthorizeSession> {
        self.stores
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AuthError::invalid_request("No active authorization session"))
    }

    async fn session_client(&self, session: &AuthorizeSession) -> AuthResult<Client> {
        self.stores
            .clients
            .find_by_client_id(&session.client_id)
            .await?
            .filter(|c| c.active)
            .ok_or_else(|| AuthError::invalid_client("Client is no longer registered"))
    }

    async fn record(
        &self,
        issued: &IssuedToken,
        user: &SessionUser,
        client_id: &str,
        scope: &str,
    ) -> AuthResult<()> {
        let expires_at = OffsetDateTime::from_unix_timestamp(issued.claims.exp)
            .map_err(|e| AuthError::internal(format!("Token expiry out of range: {e}")))?;
        let record = StoredToken {
            token_type: issued.claims.token_type,
            user: user.clone(),
            client_id: client_id.to_string(),
            scope: scope.to_string(),
            expires_at,
        };
        self.stores.tokens.store(&issued.token, &record).await.map_err(|e| {
            tracing::error!(client_id = %client_id, error = %e, "Failed to record issued token");
            e
        })
    }
}

fn signing_failed(error: JwtError) -> AuthError {
    tracing::error!(error = %error, "Token signing failed");
    AuthError::internal(format!("Token signing failed: {error}"))
}

fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    if value.eq_ignore_ascii_case("bearer") {
        return "";
    }
    match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    }
}
