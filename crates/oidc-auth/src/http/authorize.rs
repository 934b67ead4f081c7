//! Authorization endpoint handlers.
//!
//! Login and consent pages are rendered elsewhere; these handlers speak JSON
//! prompts to whatever collects the user's credentials and decision.
//!
//! # Flow
//!
//! ```text
//! GET /authorize?client_id=...&redirect_uri=...&code_challenge=...
//!     ├─► Invalid client/redirect_uri/PKCE → 400 text (no redirect)
//!     └─► Set oauth_session cookie → {"next": "login"}
//!
//! POST /authorize (username, password)
//!     ├─► No live session → 400
//!     ├─► Bad credentials → 401, cookie cleared
//!     └─► {"next": "consent"}
//!
//! POST /consent (decision=approve|deny)
//!     ├─► Not logged in → 401
//!     └─► 302 redirect_uri?code=...&state=... (or error=access_denied)
//! ```

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProviderState;
use crate::error::AuthError;
use crate::oauth::authorize::AuthorizationRequest;
use crate::oauth::flow::{ConsentDecision, PendingAuthorization};

/// What the collector should ask the user for next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextStep {
    /// Ask for username and password.
    Login,
    /// Ask for consent.
    Consent,
}

/// Prompt returned by `GET /authorize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPrompt {
    /// Authorize session id, also set as the session cookie.
    pub session_id: Uuid,
    /// Requesting client.
    pub client_id: String,
    /// Display name of the requesting client.
    pub client_name: String,
    /// Requested scope.
    pub scope: String,
    /// Always [`NextStep::Login`].
    pub next: NextStep,
}

/// Prompt returned by a successful `POST /authorize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentPrompt {
    /// Requesting client.
    pub client_id: String,
    /// Display name of the requesting client.
    pub client_name: String,
    /// Requested scope.
    pub scope: String,
    /// Always [`NextStep::Consent`].
    pub next: NextStep,
}

/// Form data for `POST /authorize`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    /// Username as registered.
    #[serde(default)]
    pub username: String,
    /// Plaintext password, checked against the stored hash.
    #[serde(default)]
    pub password: String,
}

/// Form data for `POST /consent`.
#[derive(Debug, Default, Deserialize)]
pub struct ConsentForm {
    /// "approve" (default) or "deny".
    #[serde(default)]
    pub decision: Option<String>,
}

/// `GET /authorize` handler.
///
/// Validates the request and opens an authorize session. Errors are never
/// redirected: the redirect URI is untrusted until validated.
pub async fn authorize_get(
    State(state): State<ProviderState>,
    jar: CookieJar,
    Query(params): Query<AuthorizationRequest>,
) -> Response {
    tracing::debug!(client_id = %params.client_id, "Processing authorization request");

    let PendingAuthorization { session, client } = match state.flow.begin(&params).await {
        Ok(pending) => pending,
        Err(e) => {
            tracing::warn!(client_id = %params.client_id, error = %e, "Authorization request rejected");
            return plain_error(&e);
        }
    };

    let jar = jar.add(session_cookie(&state, session.id));
    let prompt = LoginPrompt {
        session_id: session.id,
        client_id: client.client_id,
        client_name: client.name,
        scope: session.scope,
        next: NextStep::Login,
    };

    (StatusCode::OK, jar, Json(prompt)).into_response()
}

/// `POST /authorize` handler: checks the user's credentials.
pub async fn authorize_post(
    State(state): State<ProviderState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(session_id) = session_id(&state, &jar) else {
        return (StatusCode::BAD_REQUEST, "No active authorization session").into_response();
    };

    match state
        .flow
        .authenticate(session_id, &form.username, &form.password)
        .await
    {
        Ok(PendingAuthorization { session, client }) => {
            let prompt = ConsentPrompt {
                client_id: client.client_id,
                client_name: client.name,
                scope: session.scope,
                next: NextStep::Consent,
            };
            (StatusCode::OK, Json(prompt)).into_response()
        }
        Err(AuthError::Unauthorized { .. }) => {
            // The flow already dropped the session.
            let jar = jar.remove(removal_cookie(&state));
            (StatusCode::UNAUTHORIZED, jar, "Unauthorized").into_response()
        }
        Err(e) => plain_error(&e),
    }
}

/// `POST /consent` handler: issues the code or records the denial.
pub async fn consent_handler(
    State(state): State<ProviderState>,
    jar: CookieJar,
    Form(form): Form<ConsentForm>,
) -> Response {
    let decision = match ConsentDecision::parse(form.decision.as_deref()) {
        Ok(decision) => decision,
        Err(e) => return plain_error(&e),
    };

    let Some(session_id) = session_id(&state, &jar) else {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    };

    match state.flow.consent(session_id, decision).await {
        Ok(location) => {
            let jar = jar.remove(removal_cookie(&state));
            (StatusCode::FOUND, jar, [(header::LOCATION, location)]).into_response()
        }
        Err(e) => plain_error(&e),
    }
}

fn session_id(state: &ProviderState, jar: &CookieJar) -> Option<Uuid> {
    jar.get(&state.session.cookie_name)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

fn session_cookie(state: &ProviderState, session_id: Uuid) -> Cookie<'static> {
    Cookie::build((state.session.cookie_name.clone(), session_id.to_string()))
        .http_only(true)
        .secure(state.session.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(state.session_lifetime_secs))
        .build()
}

fn removal_cookie(state: &ProviderState) -> Cookie<'static> {
    Cookie::build(state.session.cookie_name.clone())
        .path("/")
        .build()
}

/// Minimal plain-text error for the browser-facing endpoints.
fn plain_error(error: &AuthError) -> Response {
    let status = match error {
        AuthError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        e if e.is_server_error() => {
            tracing::error!(error = %e, "Authorization endpoint failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (status, format!("{}: {}", error.oauth_error_code(), error)).into_response()
}
