//! Resource owners.

use serde::{Deserialize, Serialize};

use crate::password::{hash_password, verify_password};

/// A user who can log in at the authorize endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable subject identifier (`sub` claim).
    pub sub: String,

    /// Login name.
    pub username: String,

    /// Argon2id PHC hash of the password.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Inactive users cannot log in.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Creates an active user, hashing the plaintext password.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn new(
        sub: impl Into<String>,
        username: impl Into<String>,
        password: &str,
    ) -> Result<Self, argon2::password_hash::Error> {
        Ok(Self {
            sub: sub.into(),
            username: username.into(),
            password_hash: hash_password(password)?,
            name: None,
            email: None,
            active: true,
        })
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Checks a presented password. A corrupt stored hash never matches.
    #[must_use]
    pub fn check_password(&self, password: &str) -> bool {
        match verify_password(password, &self.password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(sub = %self.sub, error = %e, "Stored password hash is invalid");
                false
            }
        }
    }
}

/// Identity claims returned from `/userinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Subject identifier.
    pub sub: String,

    /// Display name.
    pub name: Option<String>,

    /// Email address.
    pub email: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            sub: user.sub.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
