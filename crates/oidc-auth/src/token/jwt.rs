//! JWT token generation and validation.
//!
//! Tokens are signed with the active key and verified against every key in the
//! key set, selected by the `kid` header.
//!
//! ## Supported Algorithms
//!
//! - **RS256**: RSA with SHA-256
//! - **RS384**: RSA with SHA-384
//! - **ES384**: ECDSA with P-384 curve (default for generated keys)
//!
//! ## Example
//!
//! ```ignore
//! use oidc_auth::token::jwt::{JwtService, SigningKeyPair, TokenClaims, TokenType};
//!
//! let key_pair = SigningKeyPair::generate_ec()?;
//! let jwt_service = JwtService::new(key_pair, "https://idp.example.com");
//!
//! let claims = TokenClaims::builder("https://idp.example.com", "u1", TokenType::Access)
//!     .scope("openid profile")
//!     .build();
//! let token = jwt_service.encode(&claims)?;
//! let decoded = jwt_service.decode::<TokenClaims>(&token)?;
//! ```

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, decode_header,
    encode,
};
use p384::SecretKey as EcSecretKey;
use p384::ecdsa::VerifyingKey as EcVerifyingKey;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// The token is not a well-formed JWT.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of what could not be parsed.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid or was made by an unknown key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::invalid_key(err.to_string()),
            _ => Self::malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms for JWT tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// RSA with SHA-256.
    RS256,
    /// RSA with SHA-384.
    RS384,
    /// ECDSA with P-384 curve.
    ES384,
}

impl SigningAlgorithm {
    /// Parses an algorithm name as written in configuration.
    ///
    /// # Errors
    /// Returns `JwtError::InvalidKey` for unsupported names.
    pub fn parse(name: &str) -> Result<Self, JwtError> {
        match name {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "ES384" => Ok(Self::ES384),
            other => Err(JwtError::invalid_key(format!(
                "Unsupported signing algorithm: {other}"
            ))),
        }
    }

    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Returns the algorithm name as used in JWK/JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::ES384 => "ES384",
        }
    }

    /// Returns `true` if this is an RSA-based algorithm.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Discriminator carried in every token's `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// OpenID Connect ID token.
    Id,
    /// Bearer access token.
    Access,
    /// Refresh token.
    Refresh,
}

impl TokenType {
    /// Returns the claim value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Claims shared by ID, access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (user identifier).
    pub sub: String,

    /// Audience (client ID). Set on ID tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// JWT ID.
    pub jti: String,

    /// Token type discriminator.
    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Space-separated scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// OAuth client the token was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl TokenClaims {
    /// Creates a new builder for token claims.
    #[must_use]
    pub fn builder(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        token_type: TokenType,
    ) -> TokenClaimsBuilder {
        TokenClaimsBuilder::new(issuer, subject, token_type)
    }

    /// Returns the expiry as an `OffsetDateTime`.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

/// Builder for `TokenClaims`.
pub struct TokenClaimsBuilder {
    iss: String,
    sub: String,
    aud: Option<String>,
    exp: i64,
    iat: i64,
    jti: String,
    token_type: TokenType,
    scope: Option<String>,
    client_id: Option<String>,
}

impl TokenClaimsBuilder {
    fn new(issuer: impl Into<String>, subject: impl Into<String>, token_type: TokenType) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: None,
            exp: now + 3600,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type,
            scope: None,
            client_id: None,
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    /// Sets the expiration time in seconds from now.
    #[must_use]
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.exp = self.iat.saturating_add(seconds);
        self
    }

    /// Sets the scopes.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Builds the token claims.
    #[must_use]
    pub fn build(self) -> TokenClaims {
        TokenClaims {
            iss: self.iss,
            sub: self.sub,
            aud: self.aud,
            exp: self.exp,
            iat: self.iat,
            jti: self.jti,
            token_type: self.token_type,
            scope: self.scope,
            client_id: self.client_id,
        }
    }
}

// ============================================================================
// JWKS Types
// ============================================================================

/// JSON Web Key Set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

/// JSON Web Key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "EC").
    pub kty: String,

    /// Key ID.
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm.
    pub alg: String,

    /// RSA modulus (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// EC curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

// ============================================================================
// Signing Key Pair
// ============================================================================

/// A signing key pair for JWT operations.
#[derive(Clone)]
pub struct SigningKeyPair {
    /// Key ID.
    pub kid: String,

    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    encoding_key: EncodingKey,

    decoding_key: DecodingKey,

    public_key_data: PublicKeyData,
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum PublicKeyData {
    Rsa { n: Vec<u8>, e: Vec<u8> },
    Ec { x: Vec<u8>, y: Vec<u8> },
}

impl SigningKeyPair {
    /// Generates a new 2048-bit RSA key pair.
    ///
    /// # Errors
    /// Returns an error if key generation fails or algorithm is not RSA-based.
    pub fn generate_rsa(algorithm: SigningAlgorithm) -> Result<Self, JwtError> {
        if !algorithm.is_rsa() {
            return Err(JwtError::invalid_key(format!(
                "Algorithm {algorithm} is not RSA-based"
            )));
        }

        let private_key = RsaPrivateKey::new(&mut OsRng, 2048)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Self::from_pem(
            uuid::Uuid::new_v4().to_string(),
            algorithm,
            &private_pem,
            &public_pem,
        )
    }

    /// Generates a new EC key pair using the P-384 curve.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate_ec() -> Result<Self, JwtError> {
        let secret_key = EcSecretKey::random(&mut OsRng);

        let private_pem = secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_pem = secret_key
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Self::from_pem(
            uuid::Uuid::new_v4().to_string(),
            SigningAlgorithm::ES384,
            &private_pem,
            &public_pem,
        )
    }

    /// Loads a key pair from PKCS#8 PEM strings.
    ///
    /// # Errors
    /// Returns an error if the PEM data is invalid.
    pub fn from_pem(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, JwtError> {
        let (encoding_key, decoding_key, public_key_data) = if algorithm.is_rsa() {
            let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
                .map_err(|e| JwtError::invalid_key(e.to_string()))?;
            let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
                .map_err(|e| JwtError::invalid_key(e.to_string()))?;

            let public_key = RsaPublicKey::from_public_key_pem(public_pem)
                .map_err(|e| JwtError::invalid_key(e.to_string()))?;
            let n = public_key.n().to_bytes_be();
            let e = public_key.e().to_bytes_be();

            (encoding_key, decoding_key, PublicKeyData::Rsa { n, e })
        } else {
            let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())
                .map_err(|e| JwtError::invalid_key(e.to_string()))?;

            let verifying_key = EcVerifyingKey::from_public_key_pem(public_pem)
                .map_err(|e| JwtError::invalid_key(e.to_string()))?;
            let point = verifying_key.to_encoded_point(false);
            let x = point
                .x()
                .ok_or_else(|| JwtError::invalid_key("Missing x coordinate"))?;
            let y = point
                .y()
                .ok_or_else(|| JwtError::invalid_key("Missing y coordinate"))?;

            let x_b64 = URL_SAFE_NO_PAD.encode(x.as_slice());
            let y_b64 = URL_SAFE_NO_PAD.encode(y.as_slice());
            let decoding_key = DecodingKey::from_ec_components(&x_b64, &y_b64)
                .map_err(|e| JwtError::invalid_key(e.to_string()))?;

            (
                encoding_key,
                decoding_key,
                PublicKeyData::Ec {
                    x: x.to_vec(),
                    y: y.to_vec(),
                },
            )
        };

        Ok(Self {
            kid: kid.into(),
            algorithm,
            encoding_key,
            decoding_key,
            public_key_data,
        })
    }

    /// Exports the public key as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        match &self.public_key_data {
            PublicKeyData::Rsa { n, e } => Jwk {
                kty: "RSA".to_string(),
                kid: self.kid.clone(),
                use_: "sig".to_string(),
                alg: self.algorithm.as_str().to_string(),
                n: Some(URL_SAFE_NO_PAD.encode(n)),
                e: Some(URL_SAFE_NO_PAD.encode(e)),
                crv: None,
                x: None,
                y: None,
            },
            PublicKeyData::Ec { x, y } => Jwk {
                kty: "EC".to_string(),
                kid: self.kid.clone(),
                use_: "sig".to_string(),
                alg: self.algorithm.as_str().to_string(),
                n: None,
                e: None,
                crv: Some("P-384".to_string()),
                x: Some(URL_SAFE_NO_PAD.encode(x)),
                y: Some(URL_SAFE_NO_PAD.encode(y)),
            },
        }
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for encoding and decoding JWT tokens.
///
/// Signs with a single active key. Verification accepts the active key and
/// any additional verification keys, chosen by the token's `kid` header.
pub struct JwtService {
    signing_key: SigningKeyPair,
    verification_keys: Vec<SigningKeyPair>,
    issuer: String,
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.issuer)
            .field("kid", &self.signing_key.kid)
            .field("verification_keys", &self.verification_keys.len())
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Creates a new JWT service.
    #[must_use]
    pub fn new(signing_key: SigningKeyPair, issuer: impl Into<String>) -> Self {
        Self {
            signing_key,
            verification_keys: Vec::new(),
            issuer: issuer.into(),
        }
    }

    /// Adds a key that is accepted for verification but never used to sign.
    #[must_use]
    pub fn with_verification_key(mut self, key: SigningKeyPair) -> Self {
        if key.kid != self.signing_key.kid {
            self.verification_keys.push(key);
        }
        self
    }

    /// Encodes claims into a JWT string.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let mut header = Header::new(self.signing_key.algorithm.to_jwt_algorithm());
        header.kid = Some(self.signing_key.kid.clone());

        encode(&header, claims, &self.signing_key.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes and validates a JWT string.
    ///
    /// Signature, issuer and expiry are checked. Audience is checked by callers.
    ///
    /// # Errors
    /// Returns `Malformed`, `InvalidSignature`, `Expired` or `InvalidClaims`.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<TokenData<T>, JwtError> {
        let header = decode_header(token).map_err(JwtError::from)?;
        let key = self
            .find_key(header.kid.as_deref())
            .ok_or(JwtError::InvalidSignature)?;

        let mut validation = Validation::new(key.algorithm.to_jwt_algorithm());
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.validate_aud = false;

        decode(token, &key.decoding_key, &validation).map_err(JwtError::from)
    }

    fn find_key(&self, kid: Option<&str>) -> Option<&SigningKeyPair> {
        match kid {
            None => Some(&self.signing_key),
            Some(kid) => std::iter::once(&self.signing_key)
                .chain(self.verification_keys.iter())
                .find(|key| key.kid == kid),
        }
    }

    /// Returns the current signing key ID.
    #[must_use]
    pub fn current_kid(&self) -> &str {
        &self.signing_key.kid
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the JWKS containing every verification key.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: std::iter::once(&self.signing_key)
                .chain(self.verification_keys.iter())
                .map(SigningKeyPair::to_jwk)
                .collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
