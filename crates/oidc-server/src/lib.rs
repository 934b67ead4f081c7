pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, BootstrapConfig, CleanupConfig, ClientSeed, ServerConfig, UserSeed};
pub use observability::init_tracing;
pub use server::{OidcServer, ServerBuilder, build_app, build_flow, build_router, spawn_cleanup};
