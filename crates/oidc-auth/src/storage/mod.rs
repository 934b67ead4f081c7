//! Storage traits for authentication and authorization data.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Users
//! - In-flight authorize sessions
//! - Authorization codes
//! - Issued access and refresh tokens
//!
//! # Implementations
//!
//! [`memory`] provides `DashMap`-backed implementations of every trait. A
//! durable backend can be swapped in without touching the flow controller.

pub mod authorize_session;
pub mod client;
pub mod code;
pub mod memory;
pub mod token;
pub mod user;

pub use authorize_session::AuthorizeSessionStorage;
pub use client::ClientStorage;
pub use code::AuthorizationCodeStorage;
pub use memory::{
    InMemoryAuthorizeSessionStorage, InMemoryClientStorage, InMemoryCodeStorage,
    InMemoryTokenStorage, InMemoryUserStorage,
};
pub use token::{StoredToken, TokenStorage};
pub use user::UserStorage;
