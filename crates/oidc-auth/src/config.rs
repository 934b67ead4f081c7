//! Authentication and authorization configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "https://idp.example.com"
//!
//! [auth.oauth]
//! access_token_lifetime = "1h"
//! refresh_token_lifetime = "30d"
//!
//! [auth.signing]
//! algorithm = "RS256"
//!
//! [[auth.signing.keys]]
//! kid = "2024-01"
//! private_key_path = "keys/private.pem"
//! public_key_path = "keys/public.pem"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URL, used as the `iss` claim of every token.
    pub issuer: String,

    /// Token and code lifetimes.
    pub oauth: OAuthConfig,

    /// Token signing keys.
    pub signing: SigningConfig,

    /// Browser session cookie settings for the authorize/consent sub-flow.
    pub session: SessionConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:5000".to_string(),
            oauth: OAuthConfig::default(),
            signing: SigningConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Lifetimes of codes, tokens and in-flight authorize sessions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// ID token lifetime.
    #[serde(with = "humantime_serde")]
    pub id_token_lifetime: Duration,

    /// Access token lifetime for the authorization code grant.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Access token lifetime when minted from a refresh token.
    #[serde(with = "humantime_serde")]
    pub refreshed_access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// How long a user has to log in and consent once `/authorize` was hit.
    #[serde(with = "humantime_serde")]
    pub authorize_session_lifetime: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600),
            id_token_lifetime: Duration::from_secs(600),
            access_token_lifetime: Duration::from_secs(3600),
            refreshed_access_token_lifetime: Duration::from_secs(1800),
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600),
            authorize_session_lifetime: Duration::from_secs(600),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Default signing algorithm.
    /// Supported: "RS256", "RS384", "ES384"
    pub algorithm: String,

    /// PEM key pairs. The first one signs; all of them verify.
    /// When empty, an ephemeral key is generated at startup.
    pub keys: Vec<SigningKeyConfig>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "ES384".to_string(),
            keys: Vec::new(),
        }
    }
}

/// A PEM key pair on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SigningKeyConfig {
    /// Key ID published in the JWKS and JWT headers.
    pub kid: String,

    /// Overrides `signing.algorithm` for this key.
    #[serde(default)]
    pub algorithm: Option<String>,

    /// PKCS#8 PEM private key.
    pub private_key_path: PathBuf,

    /// SPKI PEM public key.
    pub public_key_path: PathBuf,
}

/// Authorize session cookie settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the authorize session id.
    pub cookie_name: String,

    /// Set the `Secure` attribute (enable behind HTTPS).
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "oauth_session".to_string(),
            secure_cookies: false,
        }
    }
}

/// Upper bound for any configured lifetime.
pub const MAX_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The issuer URL is empty or not a URL
    /// - A signing algorithm is not supported
    /// - A lifetime is zero or longer than a year
    /// - Key IDs are empty or duplicated
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("auth.issuer".to_string()));
        }
        if url::Url::parse(&self.issuer).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "auth.issuer is not a valid URL: '{}'",
                self.issuer
            )));
        }

        validate_algorithm(&self.signing.algorithm)?;

        let lifetimes = [
            (
                "authorization_code_lifetime",
                self.oauth.authorization_code_lifetime,
            ),
            ("id_token_lifetime", self.oauth.id_token_lifetime),
            ("access_token_lifetime", self.oauth.access_token_lifetime),
            (
                "refreshed_access_token_lifetime",
                self.oauth.refreshed_access_token_lifetime,
            ),
            ("refresh_token_lifetime", self.oauth.refresh_token_lifetime),
            (
                "authorize_session_lifetime",
                self.oauth.authorize_session_lifetime,
            ),
        ];
        for (name, value) in lifetimes {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.oauth.{name} must be > 0"
                )));
            }
            if value > MAX_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.oauth.{name} must not exceed 365 days"
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for key in &self.signing.keys {
            if key.kid.is_empty() {
                return Err(ConfigError::Missing("auth.signing.keys[].kid".to_string()));
            }
            if !seen.insert(key.kid.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate signing key id '{}'",
                    key.kid
                )));
            }
            if let Some(algorithm) = &key.algorithm {
                validate_algorithm(algorithm)?;
            }
        }

        if self.session.cookie_name.is_empty() {
            return Err(ConfigError::Missing("auth.session.cookie_name".to_string()));
        }

        Ok(())
    }
}

fn validate_algorithm(algorithm: &str) -> Result<(), ConfigError> {
    match algorithm {
        "RS256" | "RS384" | "ES384" => Ok(()),
        other => Err(ConfigError::InvalidValue(format!(
            "Invalid signing algorithm: '{other}'. Must be RS256, RS384, or ES384"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.signing.algorithm, "ES384");
        assert!(config.signing.keys.is_empty());
        assert_eq!(config.session.cookie_name, "oauth_session");
        assert_eq!(
            config.oauth.refreshed_access_token_lifetime,
            Duration::from_secs(1800)
        );
    }

    #[test]
    fn test_default_config_validates() {
        assert!(AuthConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_algorithm() {
        let mut config = AuthConfig::default();
        config.signing.algorithm = "HS256".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_empty_issuer() {
        let config = AuthConfig {
            issuer: String::new(),
            ..AuthConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        let mut config = AuthConfig::default();
        config.oauth.authorization_code_lifetime = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("authorization_code_lifetime"));

        let mut config = AuthConfig::default();
        config.oauth.refresh_token_lifetime = MAX_LIFETIME + Duration::from_secs(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_kid_rejected() {
        let key = SigningKeyConfig {
            kid: "k1".to_string(),
            algorithm: None,
            private_key_path: PathBuf::from("private.pem"),
            public_key_path: PathBuf::from("public.pem"),
        };
        let mut config = AuthConfig::default();
        config.signing.keys = vec![key.clone(), key];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_humantime_deserialization() {
        let json = r#"{
            "issuer": "https://idp.example.com",
            "oauth": { "access_token_lifetime": "15m", "refresh_token_lifetime": "7d" }
        }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.oauth.access_token_lifetime, Duration::from_secs(900));
        assert_eq!(
            config.oauth.refresh_token_lifetime,
            Duration::from_secs(7 * 24 * 3600)
        );
        assert_eq!(
            config.oauth.authorization_code_lifetime,
            Duration::from_secs(600)
        );
    }
}
