//! Signing key set construction.
//!
//! Keys come from PEM files listed in `auth.signing.keys`. With no keys
//! configured, one ephemeral key is generated; its tokens stop verifying
//! after a restart.

use std::fs;

use tracing::{info, warn};

use crate::AuthResult;
use crate::config::{AuthConfig, SigningKeyConfig};
use crate::error::AuthError;
use crate::token::jwt::{JwtService, SigningAlgorithm, SigningKeyPair};

/// Builds the JWT service from configuration.
///
/// # Errors
/// Returns `AuthError::Configuration` if a key file cannot be read or parsed.
pub fn load_jwt_service(config: &AuthConfig) -> AuthResult<JwtService> {
    let default_algorithm = parse_algorithm(&config.signing.algorithm)?;

    let mut keys = config
        .signing
        .keys
        .iter()
        .map(|key| load_key(key, default_algorithm))
        .collect::<AuthResult<Vec<_>>>()?
        .into_iter();

    let signing_key = match keys.next() {
        Some(key) => key,
        None => {
            warn!(
                algorithm = %default_algorithm,
                "No signing keys configured, generating an ephemeral key"
            );
            generate_key(default_algorithm)?
        }
    };

    info!(kid = %signing_key.kid, algorithm = %signing_key.algorithm, "Signing key ready");

    let mut service = JwtService::new(signing_key, config.issuer.clone());
    for key in keys {
        info!(kid = %key.kid, "Verification key loaded");
        service = service.with_verification_key(key);
    }
    Ok(service)
}

fn load_key(
    key: &SigningKeyConfig,
    default_algorithm: SigningAlgorithm,
) -> AuthResult<SigningKeyPair> {
    let algorithm = match &key.algorithm {
        Some(name) => parse_algorithm(name)?,
        None => default_algorithm,
    };

    let private_pem = fs::read_to_string(&key.private_key_path).map_err(|e| {
        AuthError::configuration(format!(
            "cannot read private key {}: {e}",
            key.private_key_path.display()
        ))
    })?;
    let public_pem = fs::read_to_string(&key.public_key_path).map_err(|e| {
        AuthError::configuration(format!(
            "cannot read public key {}: {e}",
            key.public_key_path.display()
        ))
    })?;

    SigningKeyPair::from_pem(key.kid.clone(), algorithm, &private_pem, &public_pem)
        .map_err(|e| AuthError::configuration(format!("signing key '{}': {e}", key.kid)))
}

fn generate_key(algorithm: SigningAlgorithm) -> AuthResult<SigningKeyPair> {
    let key = if algorithm.is_rsa() {
        SigningKeyPair::generate_rsa(algorithm)
    } else {
        SigningKeyPair::generate_ec()
    };
    key.map_err(|e| AuthError::internal(e.to_string()))
}

fn parse_algorithm(name: &str) -> AuthResult<SigningAlgorithm> {
    SigningAlgorithm::parse(name).map_err(|e| AuthError::configuration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use p384::SecretKey;
    use rand::rngs::OsRng;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use std::path::Path;

    use crate::token::jwt::{TokenClaims, TokenType};

    fn write_ec_pair(dir: &Path, name: &str) -> SigningKeyConfig {
        let secret = SecretKey::random(&mut OsRng);
        let private_path = dir.join(format!("{name}-private.pem"));
        let public_path = dir.join(format!("{name}-public.pem"));
        fs::write(
            &private_path,
            secret.to_pkcs8_pem(LineEnding::LF).unwrap().as_bytes(),
        )
        .unwrap();
        fs::write(
            &public_path,
            secret.public_key().to_public_key_pem(LineEnding::LF).unwrap(),
        )
        .unwrap();
        SigningKeyConfig {
            kid: name.to_string(),
            algorithm: None,
            private_key_path: private_path,
            public_key_path: public_path,
        }
    }

    #[test]
    fn test_ephemeral_key_when_none_configured() {
        let service = load_jwt_service(&AuthConfig::default()).unwrap();
        let jwks = service.jwks();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].alg, "ES384");
    }

    #[test]
    fn test_loads_configured_keys_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AuthConfig::default();
        config.signing.keys = vec![
            write_ec_pair(dir.path(), "current"),
            write_ec_pair(dir.path(), "previous"),
        ];

        let service = load_jwt_service(&config).unwrap();
        assert_eq!(service.current_kid(), "current");

        let kids: Vec<_> = service.jwks().keys.into_iter().map(|k| k.kid).collect();
        assert_eq!(kids, vec!["current", "previous"]);

        let token = service
            .encode(&TokenClaims::builder(&config.issuer, "u1", TokenType::Access).build())
            .unwrap();
        assert!(service.decode::<TokenClaims>(&token).is_ok());
    }

    #[test]
    fn test_missing_key_file_is_configuration_error() {
        let mut config = AuthConfig::default();
        config.signing.keys = vec![SigningKeyConfig {
            kid: "missing".to_string(),
            algorithm: None,
            private_key_path: "/nonexistent/private.pem".into(),
            public_key_path: "/nonexistent/public.pem".into(),
        }];

        let err = load_jwt_service(&config).unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }
}
