use oidc_auth::config::AuthConfig;
use oidc_auth::types::GrantType;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Issuer, lifetimes, signing keys and session cookie
    #[serde(default)]
    pub auth: AuthConfig,
    /// Background removal of expired sessions, codes and tokens
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Clients and users registered at startup
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.cleanup.interval.is_zero() {
            return Err("cleanup.interval must be > 0".into());
        }
        self.auth.validate().map_err(|e| e.to_string())?;
        self.bootstrap.validate()?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        let ip: std::net::IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cleanup_interval", with = "humantime_serde")]
    pub interval: Duration,
}
fn default_cleanup_enabled() -> bool {
    true
}
fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}
impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_cleanup_enabled(),
            interval: default_cleanup_interval(),
        }
    }
}

/// Seed data. Secrets and passwords are plaintext here and hashed on load.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub clients: Vec<ClientSeed>,
    #[serde(default)]
    pub users: Vec<UserSeed>,
}

impl BootstrapConfig {
    fn validate(&self) -> Result<(), String> {
        for client in &self.clients {
            if client.client_id.is_empty() {
                return Err("bootstrap.clients[].client_id must not be empty".into());
            }
            if client.redirect_uris.is_empty() {
                return Err(format!(
                    "bootstrap client '{}' needs at least one redirect_uri",
                    client.client_id
                ));
            }
            if client.client_secret.as_deref() == Some("") {
                return Err(format!(
                    "bootstrap client '{}' has an empty client_secret",
                    client.client_id
                ));
            }
        }
        for user in &self.users {
            if user.username.is_empty() || user.sub.is_empty() {
                return Err("bootstrap.users[] needs username and sub".into());
            }
            if user.password.is_empty() {
                return Err(format!(
                    "bootstrap user '{}' has an empty password",
                    user.username
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ClientSeed {
    pub client_id: String,
    /// Absent for public clients.
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Defaults to authorization_code + refresh_token.
    #[serde(default)]
    pub grant_types: Vec<GrantType>,
}

impl std::fmt::Debug for ClientSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSeed")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name)
            .field("redirect_uris", &self.redirect_uris)
            .field("grant_types", &self.grant_types)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct UserSeed {
    pub sub: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl std::fmt::Debug for UserSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSeed")
            .field("sub", &self.sub)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish()
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("oidc.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., OIDC__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("OIDC")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.cleanup.interval, Duration::from_secs(60));
        assert!(cfg.bootstrap.clients.is_empty());
    }

    #[test]
    fn test_bad_log_level() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }

    #[test]
    fn test_auth_errors_surface() {
        let mut cfg = AppConfig::default();
        cfg.auth.signing.algorithm = "none".into();
        assert!(cfg.validate().unwrap_err().contains("signing algorithm"));
    }

    #[test]
    fn test_seed_debug_redacts_secrets() {
        let user = UserSeed {
            sub: "u1".into(),
            username: "alice".into(),
            password: "secret123".into(),
            name: None,
            email: None,
        };
        assert!(!format!("{user:?}").contains("secret123"));
    }
}
