//! SPPG Monitor Core
//!
//! Wires durable storage, the backend transport and the session manager into
//! one `App` that a UI layer holds and reads session state from.

mod app;
mod config;
mod error;

pub use app::App;
pub use config::Config;
pub use error::CoreError;

// Re-export the session surface UI code works with
pub use sppg_api::{ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError};
pub use sppg_auth::{
    AuthError, AuthorizedClient, PasswordChange, Permission, ProfileUpdate, Role, Session,
    SessionManager, User,
};
pub use sppg_storage::{Database, KeyValueStore, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
