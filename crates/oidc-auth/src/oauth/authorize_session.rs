//! In-flight authorization requests.
//!
//! An [`AuthorizeSession`] tracks one browser's walk through the
//! login → consent screens before an authorization code exists.
//!
//! # Lifecycle
//!
//! 1. Created on `GET /authorize` (state `AwaitingCredentials`)
//! 2. User logs in; the user is bound (state `AwaitingConsent`)
//! 3. User approves or denies; the session is deleted either way
//!
//! A failed login or an expired session also ends the flow.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::oauth::pkce::PkceChallenge;

/// Default session expiry in seconds (10 minutes).
pub const DEFAULT_SESSION_EXPIRY_SECS: i64 = 600;

/// Where a flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Waiting for the user to log in.
    AwaitingCredentials,
    /// User authenticated, waiting for a consent decision.
    AwaitingConsent,
}

/// The user bound to a session after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Login name.
    pub username: String,
    /// Subject identifier.
    pub sub: String,
}

/// Per-flow authorization request state, keyed by the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeSession {
    /// Unique session identifier (stored in cookie).
    pub id: Uuid,

    /// Requesting client.
    pub client_id: String,

    /// Validated redirect URI.
    pub redirect_uri: String,

    /// Echoed back on the redirect.
    pub state: Option<String>,

    /// Requested scope (space-separated).
    pub scope: String,

    /// PKCE challenge to bind into the authorization code.
    pub code_challenge: PkceChallenge,

    /// Set once the user has logged in.
    pub user: Option<SessionUser>,

    /// Current step of the flow.
    pub flow_state: FlowState,

    /// Timestamp when the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp when the session expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizeSession {
    /// Starts a new session awaiting credentials.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        state: Option<String>,
        scope: impl Into<String>,
        code_challenge: PkceChallenge,
        expiry_secs: i64,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            state,
            scope: scope.into(),
            code_challenge,
            user: None,
            flow_state: FlowState::AwaitingCredentials,
            created_at: now,
            expires_at: now + time::Duration::seconds(expiry_secs),
        }
    }

    /// Checks if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Checks if the user has authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.flow_state == FlowState::AwaitingConsent
    }

    /// Binds the authenticated user and moves on to consent.
    pub fn bind_user(&mut self, username: impl Into<String>, sub: impl Into<String>) {
        self.user = Some(SessionUser {
            username: username.into(),
            sub: sub.into(),
        });
        self.flow_state = FlowState::AwaitingConsent;
    }

    /// Returns the requested scopes.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::pkce::{PkceChallengeMethod, PkceVerifier};

    fn session() -> AuthorizeSession {
        AuthorizeSession::new(
            "test-client",
            "https://example.com/callback",
            Some("test-state-123".to_string()),
            "openid profile",
            PkceChallenge::from_verifier(&PkceVerifier::generate()),
            DEFAULT_SESSION_EXPIRY_SECS,
        )
    }

    #[test]
    fn test_new_session() {
        let session = session();
        assert!(!session.is_expired());
        assert!(!session.is_authenticated());
        assert_eq!(session.flow_state, FlowState::AwaitingCredentials);
        assert_eq!(session.code_challenge.method(), PkceChallengeMethod::S256);
        assert_eq!(session.scopes(), vec!["openid", "profile"]);
    }

    #[test]
    fn test_bind_user() {
        let mut session = session();
        session.bind_user("alice", "u1");
        assert!(session.is_authenticated());
        assert_eq!(session.flow_state, FlowState::AwaitingConsent);
        assert_eq!(session.user.as_ref().map(|u| u.sub.as_str()), Some("u1"));
    }

    #[test]
    fn test_expired_session() {
        let mut session = session();
        session.expires_at = OffsetDateTime::now_utc() - time::Duration::seconds(1);
        assert!(session.is_expired());
    }

    #[test]
    fn test_serialization() {
        let session = session();
        let json = serde_json::to_string(&session).unwrap();
        let deserialized: AuthorizeSession = serde_json::from_str(&json).unwrap();
        assert_eq!(session.id, deserialized.id);
        assert_eq!(session.code_challenge, deserialized.code_challenge);
    }
}
