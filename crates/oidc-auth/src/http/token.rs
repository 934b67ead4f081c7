//! Token endpoint handlers.
//!
//! - `POST /token` - `authorization_code` and `refresh_token` grants
//! - `POST /token/refresh` - refresh without a `grant_type` field
//!
//! # Example
//!
//! ```ignore
//! POST /token
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <base64(client_id:client_secret)>
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &client_id=my-app
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! ```

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};

use super::ProviderState;
use crate::error::AuthError;
use crate::oauth::client_auth::ClientCredentials;
use crate::oauth::token::{TokenError, TokenRequest, TokenResponse};

/// `POST /token` handler.
///
/// Clients authenticate with HTTP Basic, with `client_id` + `client_secret`
/// form fields, or with `client_id` alone when public.
pub async fn token_handler(
    State(state): State<ProviderState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    let grant_type = request.grant_type.as_deref().unwrap_or_default();
    tracing::debug!(
        grant_type = %grant_type,
        client_id = ?request.client_id,
        "Processing token request"
    );

    let credentials = credentials(&headers, &request);
    let result = match grant_type {
        "authorization_code" => state.flow.exchange_code(&credentials, &request).await,
        "refresh_token" => {
            state
                .flow
                .refresh(&credentials, request.refresh_token.as_deref())
                .await
        }
        "" => Err(AuthError::invalid_request("Missing grant_type")),
        other => Err(AuthError::unsupported_grant_type(other)),
    };

    respond(result, grant_type, &credentials)
}

/// `POST /token/refresh` handler.
pub async fn refresh_handler(
    State(state): State<ProviderState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    let credentials = credentials(&headers, &request);
    let result = state
        .flow
        .refresh(&credentials, request.refresh_token.as_deref())
        .await;

    respond(result, "refresh_token", &credentials)
}

fn credentials(headers: &HeaderMap, request: &TokenRequest) -> ClientCredentials {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    ClientCredentials::from_request(
        authorization,
        request.client_id.clone(),
        request.client_secret.clone(),
    )
}

fn respond(
    result: Result<TokenResponse, AuthError>,
    grant_type: &str,
    credentials: &ClientCredentials,
) -> Response {
    let client_id = credentials.claimed_client_id().unwrap_or("-");
    match result {
        Ok(response) => {
            tracing::info!(client_id = %client_id, grant_type = %grant_type, "Token issued");
            token_success_response(response)
        }
        Err(e) => {
            if e.is_server_error() {
                tracing::error!(client_id = %client_id, grant_type = %grant_type, error = %e, "Token request failed");
            } else {
                tracing::warn!(
                    client_id = %client_id,
                    grant_type = %grant_type,
                    category = ?e.category(),
                    error = %e,
                    "Token request rejected"
                );
            }
            token_error_response(&e)
        }
    }
}

/// 200 with the token set.
pub fn token_success_response(response: TokenResponse) -> Response {
    (
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(response),
    )
        .into_response()
}

/// OAuth error body with the status its code calls for.
pub fn token_error_response(error: &AuthError) -> Response {
    let body = TokenError::from(error);
    let status = StatusCode::from_u16(body.error.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
        .into_response()
}
