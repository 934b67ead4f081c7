//! Authorization codes.
//!
//! A code is created at consent and redeemed exactly once at the token
//! endpoint. It binds the issuing client, the authenticated user, the
//! redirect URI and the PKCE challenge.
//!
//! Codes are 256 bits of randomness, base64url-encoded (43 characters).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::oauth::authorize_session::SessionUser;
use crate::oauth::pkce::PkceChallenge;

/// Default authorization code lifetime in seconds (10 minutes).
pub const DEFAULT_CODE_EXPIRY_SECS: i64 = 600;

/// A stored authorization code awaiting redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The code value handed to the client.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// User who consented.
    pub user: SessionUser,

    /// Redirect URI the code was delivered to.
    pub redirect_uri: String,

    /// Granted scope (space-separated).
    pub scope: String,

    /// PKCE challenge the redeeming verifier must match.
    pub code_challenge: PkceChallenge,

    /// Timestamp when the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,

    /// Timestamp after which the code cannot be redeemed.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Issues a fresh code with a random value.
    #[must_use]
    pub fn issue(
        client_id: impl Into<String>,
        user: SessionUser,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
        code_challenge: PkceChallenge,
        lifetime_secs: i64,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            code: Self::generate_code(),
            client_id: client_id.into(),
            user,
            redirect_uri: redirect_uri.into(),
            scope: scope.into(),
            code_challenge,
            issued_at: now,
            expires_at: now + time::Duration::seconds(lifetime_secs),
        }
    }

    /// Generates a new cryptographically secure code value.
    #[must_use]
    pub fn generate_code() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the code can no longer be redeemed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}
