//! PKCE (Proof Key for Code Exchange) implementation
//!
//! Implements RFC 7636 with the `S256` and `plain` methods. Comparisons are
//! constant-time and every failure path answers "no match".
//!
//! # Example
//!
//! ```
//! use oidc_auth::oauth::{PkceVerifier, PkceChallenge, PkceChallengeMethod};
//!
//! // Client generates a verifier and challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! // Server stores challenge, later verifies with verifier from token request
//! let stored = PkceChallenge::new(challenge.as_str().to_string(), PkceChallengeMethod::S256).unwrap();
//! assert!(stored.verify(&verifier).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the valid range (43-128 characters).
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains invalid characters.
    #[error("Invalid verifier characters: must be unreserved ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,

    /// Challenge format is invalid for its method.
    #[error("Invalid challenge format for method {0}")]
    InvalidChallengeFormat(PkceChallengeMethod),

    /// Unsupported challenge method.
    #[error("Unsupported challenge method: {0}. Supported: S256, plain")]
    UnsupportedMethod(String),

    /// PKCE verification failed (verifier doesn't match challenge).
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

impl PkceError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Create an `InvalidVerifierLength` error.
    #[must_use]
    pub fn invalid_verifier_length(len: usize) -> Self {
        Self::InvalidVerifierLength(len)
    }

    /// Create an `UnsupportedMethod` error.
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod(method.into())
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a verifier validation error.
    #[must_use]
    pub fn is_verifier_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidVerifierLength(_) | Self::InvalidVerifierCharacters
        )
    }

    /// Returns `true` if this is a challenge validation error.
    #[must_use]
    pub fn is_challenge_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidChallengeFormat(_) | Self::UnsupportedMethod(_)
        )
    }

    /// Every PKCE failure is reported as `invalid_request`.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        "invalid_request"
    }
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PkceChallengeMethod {
    /// `BASE64URL(SHA256(verifier))`.
    S256,
    /// The challenge is the verifier itself.
    #[serde(rename = "plain")]
    Plain,
}

impl PkceChallengeMethod {
    /// Parse challenge method from string.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything but "S256" or "plain".
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::unsupported_method(other)),
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// RFC 7636 section 4.3: an absent method means `plain`.
impl Default for PkceChallengeMethod {
    fn default() -> Self {
        Self::Plain
    }
}

// =============================================================================
// PKCE Verifier
// =============================================================================

/// PKCE code verifier.
///
/// A high-entropy string of 43 to 128 characters drawn from the unreserved
/// set `[A-Z] / [a-z] / [0-9] / "-" / "." / "_" / "~"` (RFC 7636 section 4.1).
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Create a new verifier from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Length is not between 43 and 128 characters
    /// - Contains characters other than `[A-Za-z0-9-._~]`
    pub fn new(verifier: String) -> Result<Self, PkceError> {
        check_unreserved(&verifier)?;
        Ok(Self(verifier))
    }

    /// Generate a cryptographically random verifier.
    ///
    /// Generates 32 random bytes and encodes them as base64url (43 characters).
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Get the verifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PkceVerifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn check_unreserved(value: &str) -> Result<(), PkceError> {
    let len = value.len();
    if !(43..=128).contains(&len) {
        return Err(PkceError::invalid_verifier_length(len));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
    {
        return Err(PkceError::InvalidVerifierCharacters);
    }
    Ok(())
}

// =============================================================================
// PKCE Challenge
// =============================================================================

/// A stored PKCE code challenge together with its method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceChallenge {
    challenge: String,
    method: PkceChallengeMethod,
}

impl PkceChallenge {
    /// Derive an S256 challenge from a verifier.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        Self {
            challenge: s256(verifier.as_str()),
            method: PkceChallengeMethod::S256,
        }
    }

    /// Accept a challenge received from a client.
    ///
    /// An S256 challenge must be the 43-character base64url encoding of a
    /// SHA-256 digest. A plain challenge must itself be a valid verifier.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::InvalidChallengeFormat` if the value does not fit the method.
    pub fn new(challenge: String, method: PkceChallengeMethod) -> Result<Self, PkceError> {
        let well_formed = match method {
            PkceChallengeMethod::S256 => {
                challenge.len() == 43
                    && URL_SAFE_NO_PAD
                        .decode(&challenge)
                        .is_ok_and(|bytes| bytes.len() == 32)
            }
            PkceChallengeMethod::Plain => check_unreserved(&challenge).is_ok(),
        };
        if !well_formed {
            return Err(PkceError::InvalidChallengeFormat(method));
        }
        Ok(Self { challenge, method })
    }

    /// Verify that a verifier matches this challenge in constant time.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::VerificationFailed` if the verifier doesn't match.
    pub fn verify(&self, verifier: &PkceVerifier) -> Result<(), PkceError> {
        let matched: bool = match self.method {
            PkceChallengeMethod::S256 => s256(verifier.as_str())
                .as_bytes()
                .ct_eq(self.challenge.as_bytes())
                .into(),
            PkceChallengeMethod::Plain => verifier
                .as_str()
                .as_bytes()
                .ct_eq(self.challenge.as_bytes())
                .into(),
        };
        if matched {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Get the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.challenge
    }

    /// The method this challenge was issued with.
    #[must_use]
    pub fn method(&self) -> PkceChallengeMethod {
        self.method
    }
}

fn s256(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Checks a code verifier against a stored challenge.
///
/// Fails closed: an unknown method, a missing challenge, a missing verifier
/// or a malformed verifier all yield `false`.
#[must_use]
pub fn verify_pkce(challenge: Option<&str>, method: &str, verifier: Option<&str>) -> bool {
    let (Some(challenge), Some(verifier)) = (challenge, verifier) else {
        return false;
    };
    let Ok(method) = PkceChallengeMethod::parse(method) else {
        return false;
    };
    let Ok(verifier) = PkceVerifier::new(verifier.to_string()) else {
        return false;
    };
    let stored = PkceChallenge {
        challenge: challenge.to_string(),
        method,
    };
    stored.verify(&verifier).is_ok()
}

// =============================================================================
// Tests
// =============================================================================
