//! Seeds the client and user registries from configuration.
//!
//! Plaintext secrets and passwords from the config file are hashed here and
//! never stored or logged as-is.

use oidc_auth::storage::{ClientStorage, UserStorage};
use oidc_auth::types::{Client, User};
use tracing::info;

use crate::config::{BootstrapConfig, ClientSeed, UserSeed};

/// Counts of seeded records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    pub clients: usize,
    pub users: usize,
}

impl BootstrapReport {
    pub fn total(&self) -> usize {
        self.clients + self.users
    }
}

/// Registers every configured client and user.
///
/// # Errors
///
/// Fails on the first invalid or duplicate registration.
pub async fn seed(
    config: &BootstrapConfig,
    clients: &dyn ClientStorage,
    users: &dyn UserStorage,
) -> anyhow::Result<BootstrapReport> {
    let mut report = BootstrapReport::default();

    for seed in &config.clients {
        let client = clients.create(&client_from_seed(seed)).await?;
        info!(
            client_id = %client.client_id,
            confidential = client.confidential,
            "Registered client"
        );
        report.clients += 1;
    }

    for seed in &config.users {
        let user = users.create(&user_from_seed(seed)?).await?;
        info!(username = %user.username, sub = %user.sub, "Registered user");
        report.users += 1;
    }

    Ok(report)
}

fn client_from_seed(seed: &ClientSeed) -> Client {
    let name = seed.name.clone().unwrap_or_else(|| seed.client_id.clone());
    let mut client = match seed.client_secret.as_deref() {
        Some(secret) => Client::confidential(
            seed.client_id.clone(),
            secret,
            name,
            seed.redirect_uris.clone(),
        ),
        None => Client::public(seed.client_id.clone(), name, seed.redirect_uris.clone()),
    };
    if !seed.grant_types.is_empty() {
        client.grant_types = seed.grant_types.clone();
    }
    client
}

fn user_from_seed(seed: &UserSeed) -> anyhow::Result<User> {
    let mut user = User::new(seed.sub.clone(), seed.username.clone(), &seed.password)
        .map_err(|e| anyhow::anyhow!("failed to hash password for '{}': {e}", seed.username))?;
    if let Some(name) = &seed.name {
        user = user.with_name(name.clone());
    }
    if let Some(email) = &seed.email {
        user = user.with_email(email.clone());
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oidc_auth::storage::{InMemoryClientStorage, InMemoryUserStorage};

    fn config() -> BootstrapConfig {
        BootstrapConfig {
            clients: vec![
                ClientSeed {
                    client_id: "app".into(),
                    client_secret: Some("s3cret".into()),
                    name: Some("Demo App".into()),
                    redirect_uris: vec!["https://app.example.com/callback".into()],
                    grant_types: vec![],
                },
                ClientSeed {
                    client_id: "spa".into(),
                    client_secret: None,
                    name: None,
                    redirect_uris: vec!["https://spa.example.com/cb".into()],
                    grant_types: vec![oidc_auth::GrantType::AuthorizationCode],
                },
            ],
            users: vec![UserSeed {
                sub: "u1".into(),
                username: "alice".into(),
                password: "secret123".into(),
                name: Some("Alice".into()),
                email: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_seed() {
        let clients = InMemoryClientStorage::new();
        let users = InMemoryUserStorage::new();
        let report = seed(&config(), &clients, &users).await.unwrap();
        assert_eq!(report.total(), 3);

        let app = clients.find_by_client_id("app").await.unwrap().unwrap();
        assert!(app.confidential);
        assert!(app.verify_secret("s3cret"));

        let spa = clients.find_by_client_id("spa").await.unwrap().unwrap();
        assert!(!spa.confidential);
        assert_eq!(spa.name, "spa");
        assert_eq!(spa.grant_types.len(), 1);

        let alice = users.find_by_username("alice").await.unwrap().unwrap();
        assert!(alice.check_password("secret123"));
        assert_ne!(alice.password_hash, "secret123");
    }

    #[tokio::test]
    async fn test_duplicate_seed_fails() {
        let clients = InMemoryClientStorage::new();
        let users = InMemoryUserStorage::new();
        let mut cfg = config();
        cfg.clients.push(cfg.clients[0].clone());
        assert!(seed(&cfg, &clients, &users).await.is_err());
    }
}
