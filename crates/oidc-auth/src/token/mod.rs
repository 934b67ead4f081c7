//! Token generation, validation, and signing keys.

pub mod jwt;
pub mod keys;
pub mod service;

pub use jwt::{
    Jwk, Jwks, JwtError, JwtService, SigningAlgorithm, SigningKeyPair, TokenClaims,
    TokenClaimsBuilder, TokenType,
};
pub use keys::load_jwt_service;
pub use service::{IssuedToken, TokenConfig, TokenService};
