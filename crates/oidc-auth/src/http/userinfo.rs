//! OpenID Connect UserInfo endpoint.
//!
//! `GET /userinfo` with `Authorization: Bearer <access_token>` returns the
//! `{sub, name, email}` claims of the user the token was issued to.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};

use super::ProviderState;
use crate::error::AuthError;

/// Handler for `GET /userinfo`.
///
/// # Errors
///
/// - 401 "Missing token" without a credential
/// - 401 "Invalid token" for unknown, expired or non-access tokens
pub async fn userinfo_handler(State(state): State<ProviderState>, headers: HeaderMap) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.flow.resolve_identity(authorization).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => userinfo_error_response(&e),
    }
}

fn userinfo_error_response(error: &AuthError) -> Response {
    let body = match error {
        AuthError::MissingToken => "Missing token",
        e if e.is_server_error() => {
            tracing::error!(error = %e, "UserInfo lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
        e => {
            tracing::debug!(error = %e, "UserInfo token rejected");
            "Invalid token"
        }
    };

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_responses() {
        let response = userinfo_error_response(&AuthError::MissingToken);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let response = userinfo_error_response(&AuthError::invalid_token("Unknown token"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = userinfo_error_response(&AuthError::storage("down"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
