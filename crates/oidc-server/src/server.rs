use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use oidc_auth::http::{ProviderState, oauth_router};
use oidc_auth::oauth::{AuthorizationFlow, FlowConfig, FlowStores};
use oidc_auth::token::{TokenConfig, TokenService, load_jwt_service};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::{bootstrap, config::AppConfig, handlers};

pub struct OidcServer {
    addr: SocketAddr,
    app: Router,
    flow: Arc<AuthorizationFlow>,
    cleanup_interval: Option<std::time::Duration>,
}

/// Builds the flow controller with seeded in-memory stores.
pub async fn build_flow(cfg: &AppConfig) -> anyhow::Result<Arc<AuthorizationFlow>> {
    let jwt_service = Arc::new(load_jwt_service(&cfg.auth)?);
    tracing::info!(
        issuer = %jwt_service.issuer(),
        kid = %jwt_service.current_kid(),
        "Signing keys loaded"
    );

    let token_service = Arc::new(TokenService::new(
        jwt_service,
        TokenConfig::from_auth_config(&cfg.auth),
    ));

    let stores = FlowStores::in_memory();
    let report = bootstrap::seed(
        &cfg.bootstrap,
        stores.clients.as_ref(),
        stores.users.as_ref(),
    )
    .await?;
    tracing::info!(
        clients = report.clients,
        users = report.users,
        "Bootstrap complete"
    );

    Ok(Arc::new(AuthorizationFlow::new(
        stores,
        token_service,
        FlowConfig::from_auth_config(&cfg.auth),
    )))
}

/// Assembles the router around an existing flow controller.
pub fn build_router(cfg: &AppConfig, flow: Arc<AuthorizationFlow>) -> Router {
    let session_lifetime = FlowConfig::from_auth_config(&cfg.auth).session_lifetime_secs;
    let state = ProviderState::new(flow, cfg.auth.session.clone(), session_lifetime);

    Router::new()
        .route("/", get(handlers::root))
        .merge(oauth_router(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    // Path only: the query string carries PKCE and state values.
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

/// Builds the full application router.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let flow = build_flow(cfg).await?;
    Ok(build_router(cfg, flow))
}

/// Spawns the periodic removal of expired sessions, codes and tokens.
pub fn spawn_cleanup(flow: Arc<AuthorizationFlow>, interval: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match flow.cleanup_expired().await {
                Ok(report) if report.total() > 0 => tracing::debug!(
                    sessions = report.sessions,
                    codes = report.codes,
                    tokens = report.tokens,
                    "Expired records removed"
                ),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Cleanup failed"),
            }
        }
    })
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<OidcServer> {
        let flow = build_flow(&self.config).await?;
        let app = build_router(&self.config, flow.clone());
        let cleanup_interval = self
            .config
            .cleanup
            .enabled
            .then_some(self.config.cleanup.interval);

        Ok(OidcServer {
            addr: self.addr,
            app,
            flow,
            cleanup_interval,
        })
    }
}

impl OidcServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let cleanup = self
            .cleanup_interval
            .map(|interval| spawn_cleanup(self.flow.clone(), interval));

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(handle) = cleanup {
            handle.abort();
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
