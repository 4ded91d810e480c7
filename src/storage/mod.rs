//! Key-value persistence behind the record store.
//!
//! The store only ever needs three operations on string keys holding JSON
//! text. Backends:
//! - [`MemoryStorage`]: process-local map, used by tests and ephemeral runs.
//! - [`DatabaseStorage`]: `SQLite` table through `SeaORM`, survives restarts.

/// `SeaORM`-backed storage over the `kv_entries` table
pub mod database;
/// In-memory storage
pub mod memory;

pub use database::DatabaseStorage;
pub use memory::MemoryStorage;

use crate::errors::Result;
use std::future::Future;

/// A key-value store holding JSON text under string keys.
///
/// Implementations must treat `set` as a full replacement of the value and
/// `remove` of an absent key as a no-op.
pub trait Storage: Send + Sync {
    /// Returns the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Deletes `key`.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}
