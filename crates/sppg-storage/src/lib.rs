//! SPPG Storage Layer
//!
//! SQLite-backed durable key-value storage for client-side state.
//! Multi-key writes are transactional: either every entry lands or none does.

mod database;
mod error;
mod kv;
mod migrations;

pub use database::Database;
pub use error::StorageError;
pub use kv::KeyValueStore;

pub type Result<T> = std::result::Result<T, StorageError>;
