//! Domain types shared across the crate.
//!
//! - [`Client`] - OAuth 2.0 client registration
//! - [`GrantType`] - Supported OAuth grant types
//! - [`User`] - Resource owner
//! - [`UserInfo`] - Identity claims projected from a user

pub mod client;
pub mod user;

pub use client::{Client, ClientValidationError, GrantType};
pub use user::{User, UserInfo};
