//! # oidc-auth
//!
//! OpenID Connect provider core: the authorization code flow with PKCE,
//! ID/access/refresh token issuance and userinfo.
//!
//! ## Overview
//!
//! A request moves through [`oauth::AuthorizationFlow`]:
//! `begin` → `authenticate` → `consent` → `exchange_code` → `refresh` /
//! `resolve_identity`. Every piece of state it touches lives behind a
//! storage trait, so the in-memory stores can be swapped for a durable
//! backend.
//!
//! ## Modules
//!
//! - [`config`] - Issuer, lifetimes, signing keys and session cookie
//! - [`oauth`] - Authorization code flow, PKCE and client authentication
//! - [`token`] - JWT signing, verification and key loading
//! - [`storage`] - Storage traits and `DashMap` implementations
//! - [`types`] - Clients and users
//! - [`password`] - Argon2 password hashing
//! - [`http`] - Axum handlers for the provider endpoints

pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod password;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use http::{ProviderState, oauth_router};
pub use oauth::{AuthorizationFlow, FlowConfig, FlowStores};
pub use token::{JwtService, TokenConfig, TokenService, load_jwt_service};
pub use types::{Client, ClientValidationError, GrantType, User, UserInfo};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oidc_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{ProviderState, oauth_router};
    pub use crate::oauth::{
        AuthorizationFlow, ClientCredentials, ConsentDecision, FlowConfig, FlowStores,
        PkceChallenge, PkceChallengeMethod, PkceVerifier, TokenRequest, TokenResponse,
    };
    pub use crate::storage::{
        AuthorizationCodeStorage, AuthorizeSessionStorage, ClientStorage, TokenStorage,
        UserStorage,
    };
    pub use crate::token::{JwtService, TokenConfig, TokenService, TokenType};
    pub use crate::types::{Client, ClientValidationError, GrantType, User, UserInfo};
}
