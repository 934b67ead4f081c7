//! JWKS endpoint HTTP handler.
//!
//! `GET /.well-known/jwks.json` publishes every verification key so relying
//! parties can check ID token signatures.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use super::ProviderState;

/// Handler for `GET /.well-known/jwks.json`.
///
/// Cacheable for an hour.
///
/// # Example Response
///
/// ```json
/// {
///   "keys": [
///     {
///       "kty": "EC",
///       "kid": "key-1",
///       "use": "sig",
///       "alg": "ES384",
///       "crv": "P-384",
///       "x": "base64url-encoded-x",
///       "y": "base64url-encoded-y"
///     }
///   ]
/// }
/// ```
pub async fn jwks_handler(State(state): State<ProviderState>) -> impl IntoResponse {
    let jwks = state.flow.token_service().jwt_service().jwks();
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(jwks),
    )
}
