//! Auth error types

use thiserror::Error;

use sppg_api::TransportError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The request never reached the server
    #[error("Unable to reach server: {0}")]
    Connectivity(String),

    /// The server refused the request; displays the server's own message
    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response from server")]
    UnexpectedResponse,

    /// No usable session; the caller should route to login
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Storage error: {0}")]
    Storage(#[from] sppg_storage::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        AuthError::Connectivity(err.to_string())
    }
}
