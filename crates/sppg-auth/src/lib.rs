//! SPPG Auth Session
//!
//! Owns "who is logged in and with what credentials":
//! - the user profile, access token and refresh token, mirrored to durable storage
//! - restoration at startup, with corrupted state treated as logged out
//! - single-flight token refresh, on demand or after a 401
//! - bearer attachment and replay-once-after-refresh for outgoing requests
//!
//! Token expiry is checked locally by decoding the payload without verifying
//! the signature. That check only avoids sending requests that are known to
//! fail; the backend remains the authority on token validity.

mod client;
mod error;
mod manager;
mod session;
mod token;
mod user;
mod wire;

#[cfg(test)]
mod testing;

pub use client::AuthorizedClient;
pub use error::AuthError;
pub use manager::SessionManager;
pub use session::{keys, Session};
pub use token::{local_token_is_valid, token_is_valid_at};
pub use user::{PasswordChange, Permission, ProfileUpdate, Role, User};

pub type Result<T> = std::result::Result<T, AuthError>;
