//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] sppg_storage::StorageError),

    #[error("Auth error: {0}")]
    Auth(#[from] sppg_auth::AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] sppg_api::TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
