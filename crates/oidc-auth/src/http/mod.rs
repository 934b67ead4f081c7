//! HTTP handlers for the provider endpoints.
//!
//! # Available Handlers
//!
//! - [`authorize`] - Authorization request, login and consent
//! - [`token`] - Code exchange and refresh
//! - [`userinfo`] - Identity of a bearer token holder
//! - [`jwks`] - Public signing keys
//!
//! [`oauth_router`] mounts all of them on one [`ProviderState`].

pub mod authorize;
pub mod jwks;
pub mod token;
pub mod userinfo;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::config::SessionConfig;
use crate::oauth::flow::AuthorizationFlow;

pub use authorize::{authorize_get, authorize_post, consent_handler};
pub use jwks::jwks_handler;
pub use token::{refresh_handler, token_handler};
pub use userinfo::userinfo_handler;

/// State shared by every provider endpoint.
#[derive(Clone)]
pub struct ProviderState {
    /// The flow controller.
    pub flow: Arc<AuthorizationFlow>,
    /// Session cookie settings.
    pub session: SessionConfig,
    /// Lifetime of the session cookie, in seconds.
    pub session_lifetime_secs: i64,
}

impl ProviderState {
    /// Creates a new provider state.
    pub fn new(flow: Arc<AuthorizationFlow>, session: SessionConfig, session_lifetime_secs: i64) -> Self {
        Self {
            flow,
            session,
            session_lifetime_secs,
        }
    }
}

/// Builds the router for all provider endpoints.
pub fn oauth_router(state: ProviderState) -> Router {
    Router::new()
        .route("/.well-known/jwks.json", get(jwks_handler))
        .route("/authorize", get(authorize_get).post(authorize_post))
        .route("/consent", post(consent_handler))
        .route("/token", post(token_handler))
        .route("/token/refresh", post(refresh_handler))
        .route("/userinfo", get(userinfo_handler))
        .with_state(state)
}
