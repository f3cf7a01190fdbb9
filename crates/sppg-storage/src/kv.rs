//! Key-value store abstraction
//!
//! Session state is persisted as a handful of named string entries. The trait
//! lets the session layer be handed any durable backend; `Database` is the
//! production implementation.

use crate::Result;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Apply every write and removal, or none of them. Missing keys in
    /// `remove` are ignored.
    fn write_batch(&self, set: &[(&str, &str)], remove: &[&str]) -> Result<()>;

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        self.write_batch(entries, &[])
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        self.write_batch(&[], keys)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.remove_many(&[key])
    }
}
