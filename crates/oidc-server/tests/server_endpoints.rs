use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use oidc_auth::oauth::{PkceChallenge, PkceVerifier};
use oidc_server::{AppConfig, ClientSeed, UserSeed, build_app};
use serde_json::Value;
use tokio::task::JoinHandle;
use tower::ServiceExt;

const REDIRECT: &str = "https://app.example.com/callback";
// base64("app:s3cret")
const APP_BASIC: &str = "Basic YXBwOnMzY3JldA==";

fn config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.issuer = "http://localhost:5000".to_string();
    cfg.cleanup.enabled = false;
    cfg.bootstrap.clients = vec![
        ClientSeed {
            client_id: "app".to_string(),
            client_secret: Some("s3cret".to_string()),
            name: Some("Demo App".to_string()),
            redirect_uris: vec![REDIRECT.to_string()],
            grant_types: vec![],
        },
        ClientSeed {
            client_id: "other".to_string(),
            client_secret: Some("0ther".to_string()),
            name: None,
            redirect_uris: vec!["https://other.example.com/cb".to_string()],
            grant_types: vec![],
        },
    ];
    cfg.bootstrap.users = vec![UserSeed {
        sub: "u1".to_string(),
        username: "alice".to_string(),
        password: "secret123".to_string(),
        name: Some("Alice".to_string()),
        email: Some("alice@example.com".to_string()),
    }];
    cfg
}

async fn app() -> Router {
    build_app(&config()).await.expect("build app")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn form(uri: &str) -> axum::http::request::Builder {
    Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
}

fn encode(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn authorize_uri(client_id: &str, redirect_uri: &str, verifier: &PkceVerifier) -> String {
    let challenge = PkceChallenge::from_verifier(verifier);
    let query = encode(&[
        ("response_type", "code"),
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("scope", "openid profile"),
        ("state", "xyz"),
        ("code_challenge", challenge.as_str()),
        ("code_challenge_method", "S256"),
    ]);
    format!("/authorize?{query}")
}

/// Runs authorize → login; returns the session cookie.
async fn login(app: &Router, verifier: &PkceVerifier, password: &str) -> (String, StatusCode) {
    let (status, headers, body) = send(
        app,
        Request::get(authorize_uri("app", REDIRECT, verifier))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let prompt = json(&body);
    assert_eq!(prompt["next"], "login");
    assert_eq!(prompt["client_name"], "Demo App");
    assert_eq!(prompt["scope"], "openid profile");

    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert!(cookie.starts_with("oauth_session="));

    let body = encode(&[("username", "alice"), ("password", password)]);
    let (status, _, _) = send(
        app,
        form("/authorize")
            .header(header::COOKIE, &cookie)
            .body(Body::from(body.clone()))
            .unwrap(),
    )
    .await;
    (cookie, status)
}

/// Full authorize → login → consent; returns the code.
async fn issue_code(app: &Router, verifier: &PkceVerifier) -> String {
    let (cookie, status) = login(app, verifier, "secret123").await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, _) = send(
        app,
        form("/consent")
            .header(header::COOKIE, &cookie)
            .body(Body::from("decision=approve"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FOUND);

    let location = headers[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with(REDIRECT));
    let url = url::Url::parse(location).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("state".to_string(), "xyz".to_string())));
    pairs
        .into_iter()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v)
        .unwrap()
}

fn exchange(code: &str, verifier: &PkceVerifier) -> Request<Body> {
    let body = encode(&[
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", "app"),
        ("code_verifier", verifier.as_str()),
        ("redirect_uri", REDIRECT),
    ]);
    form("/token")
        .header(header::AUTHORIZATION, APP_BASIC)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn full_authorization_code_flow() {
    let app = app().await;
    let verifier = PkceVerifier::generate();
    let code = issue_code(&app, &verifier).await;

    // Exchange
    let (status, headers, body) = send(&app, exchange(&code, &verifier)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert_eq!(headers[header::PRAGMA], "no-cache");
    let tokens = json(&body);
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 3600);
    assert_eq!(tokens["scope"], "openid profile");
    let access_token = tokens["access_token"].as_str().unwrap().to_string();
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();
    assert!(tokens["id_token"].as_str().is_some());

    // Replay
    let (status, _, body) = send(&app, exchange(&code, &verifier)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_grant");

    // UserInfo
    let (status, _, body) = send(
        &app,
        Request::get("/userinfo")
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let info = json(&body);
    assert_eq!(info["sub"], "u1");
    assert_eq!(info["name"], "Alice");
    assert_eq!(info["email"], "alice@example.com");

    // Refresh
    let body = encode(&[("refresh_token", refresh_token.as_str())]);
    let (status, headers, body) = send(
        &app,
        form("/token/refresh")
            .header(header::AUTHORIZATION, APP_BASIC)
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    let refreshed = json(&body);
    assert_eq!(refreshed["expires_in"], 1800);
    assert_eq!(refreshed["scope"], "openid profile");
    assert!(refreshed.get("refresh_token").is_none());

    // Refresh via /token grant_type=refresh_token
    let body = encode(&[
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.as_str()),
    ]);
    let (status, _, _) = send(
        &app,
        form("/token")
            .header(header::AUTHORIZATION, APP_BASIC)
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Access token presented as refresh token
    let body = encode(&[("refresh_token", access_token.as_str())]);
    let (status, _, body) = send(
        &app,
        form("/token/refresh")
            .header(header::AUTHORIZATION, APP_BASIC)
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_token_type");
}

#[tokio::test]
async fn code_is_bound_to_client() {
    let app = app().await;
    let verifier = PkceVerifier::generate();
    let code = issue_code(&app, &verifier).await;

    let body = encode(&[
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("client_id", "other"),
        ("client_secret", "0ther"),
        ("code_verifier", verifier.as_str()),
    ]);
    let (status, _, body) = send(
        &app,
        form("/token").body(Body::from(body)).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_grant");
}

#[tokio::test]
async fn pkce_mismatch_burns_code() {
    let app = app().await;
    let verifier = PkceVerifier::generate();
    let code = issue_code(&app, &verifier).await;

    let (status, _, body) = send(&app, exchange(&code, &PkceVerifier::generate())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_request");

    let (status, _, body) = send(&app, exchange(&code, &verifier)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_grant");
}

#[tokio::test]
async fn token_endpoint_errors() {
    let app = app().await;

    let body = encode(&[("grant_type", "password"), ("client_id", "app")]);
    let (status, _, body) = send(
        &app,
        form("/token")
            .header(header::AUTHORIZATION, APP_BASIC)
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "unsupported_grant_type");

    let body = encode(&[
        ("grant_type", "authorization_code"),
        ("code", "whatever"),
        ("client_id", "app"),
        ("client_secret", "wrong"),
    ]);
    let (status, headers, body) = send(&app, form("/token").body(Body::from(body)).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert_eq!(json(&body)["error"], "invalid_client");
}

#[tokio::test]
async fn failed_login_ends_flow() {
    let app = app().await;
    let verifier = PkceVerifier::generate();
    let (cookie, status) = login(&app, &verifier, "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(
        &app,
        form("/consent")
            .header(header::COOKIE, &cookie)
            .body(Body::from("decision=approve"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn consent_denied_redirects_with_error() {
    let app = app().await;
    let verifier = PkceVerifier::generate();
    let (cookie, status) = login(&app, &verifier, "secret123").await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, _) = send(
        &app,
        form("/consent")
            .header(header::COOKIE, &cookie)
            .body(Body::from("decision=deny"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(
        headers[header::LOCATION],
        format!("{REDIRECT}?error=access_denied&state=xyz").as_str()
    );
}

#[tokio::test]
async fn authorize_rejects_bad_requests() {
    let app = app().await;
    let verifier = PkceVerifier::generate();

    let (status, _, _) = send(
        &app,
        Request::get(authorize_uri("nobody", REDIRECT, &verifier))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, headers, _) = send(
        &app,
        Request::get(authorize_uri("app", "https://evil.example.com/cb", &verifier))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers.get(header::LOCATION).is_none());

    let (status, _, _) = send(
        &app,
        form("/authorize")
            .body(Body::from("username=alice&password=secret123"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn userinfo_requires_valid_token() {
    let app = app().await;

    let (status, _, body) = send(&app, Request::get("/userinfo").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, b"Missing token");

    let (status, _, body) = send(
        &app,
        Request::get("/userinfo")
            .header(header::AUTHORIZATION, "Bearer")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, b"Missing token");

    let (status, _, body) = send(
        &app,
        Request::get("/userinfo")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, b"Invalid token");
}

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_app(&config()).await.expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn server_endpoints_work() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // GET /
    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "OIDC Provider is Running");

    // GET /.well-known/jwks.json
    let resp = client
        .get(format!("{base}/.well-known/jwks.json"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()["cache-control"].to_str().unwrap(),
        "public, max-age=3600"
    );
    let body: Value = resp.json().await.unwrap();
    let keys = body["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["alg"], "ES384");
    assert_eq!(keys[0]["use"], "sig");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
