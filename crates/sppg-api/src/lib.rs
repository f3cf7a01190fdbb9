//! SPPG API Transport
//!
//! The backend is an external REST service. This crate owns the wire-level
//! seam: request/response values, the `Transport` trait, the reqwest-backed
//! implementation, and decoding of the backend's `{success, error}` envelope.

mod envelope;
mod error;
mod request;
mod transport;

pub mod endpoints;

pub use envelope::{failure_message, Envelope};
pub use error::TransportError;
pub use request::{ApiRequest, ApiResponse, Method, AUTHORIZATION};
pub use transport::{HttpTransport, Transport, DEFAULT_TIMEOUT};

pub type Result<T> = std::result::Result<T, TransportError>;
