//! OAuth 2.0 authorization server implementation.
//!
//! - [`authorize`] - Authorization request/response types
//! - [`authorize_session`] - In-flight login/consent state
//! - [`client_auth`] - Token endpoint client authentication
//! - [`code`] - Single-use authorization codes
//! - [`flow`] - The flow controller tying it all together
//! - [`pkce`] - Proof Key for Code Exchange (RFC 7636)
//! - [`token`] - Token endpoint request/response types

pub mod authorize;
pub mod authorize_session;
pub mod client_auth;
pub mod code;
pub mod flow;
pub mod pkce;
pub mod token;

pub use authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
};
pub use authorize_session::{AuthorizeSession, FlowState, SessionUser};
pub use client_auth::{
    AuthenticatedClient, ClientCredentials, TokenEndpointAuthMethod, authenticate_client,
    parse_basic_auth,
};
pub use code::AuthorizationCode;
pub use flow::{
    AuthorizationFlow, CleanupReport, ConsentDecision, FlowConfig, FlowStores,
    PendingAuthorization,
};
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier, verify_pkce};
pub use token::{TokenError, TokenErrorCode, TokenRequest, TokenResponse};
