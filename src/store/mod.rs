//! Shared store module providing the key-value abstraction the engine runs on.
//!
//! This module implements:
//! - KeyValueStore: the trait every component is injected with
//! - MemoryStore: in-process implementation with TTL support
//! - LobbyRepository: typed access to lobby/player records
//!
//! All coordination between request handlers and background tasks happens
//! through this store; the engine keeps no authoritative in-process state.
//! The repository is the only place record fields are serialized, so the
//! rest of the crate works with typed `Lobby`/`Player` values.

pub mod memory;
pub mod repository;

pub use memory::MemoryStore;
pub use repository::LobbyRepository;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure (connection loss, protocol error, poisoned state)
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A stored field could not be decoded into its typed form
    #[error("Corrupt record field {field}: {reason}")]
    Corrupt { field: String, reason: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Minimal key-value contract the engine needs from the shared store.
///
/// Hashes hold lobby and player records, lists hold the called-number
/// history, sets hold membership (active lobbies, players per lobby), and
/// `put_if_absent` is the create-if-absent-with-expiry primitive backing
/// the start-game lease. Every operation is atomic with respect to other
/// callers of the same store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read all fields of a hash. Missing keys read as an empty map.
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// Write (or overwrite) the given fields of a hash.
    async fn hash_set(&self, key: &str, fields: Vec<(String, String)>) -> StoreResult<()>;

    /// Read a single hash field.
    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Remove fields from a hash.
    async fn hash_remove(&self, key: &str, fields: &[&str]) -> StoreResult<()>;

    /// Atomically add `delta` to an integer hash field, returning the new
    /// value. An absent field counts as zero.
    async fn hash_increment(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    /// Append to a list, returning the new length.
    async fn list_push(&self, key: &str, value: String) -> StoreResult<usize>;

    /// Read a whole list in insertion order.
    async fn list_range(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Add a member to a set.
    async fn set_add(&self, key: &str, member: String) -> StoreResult<()>;

    /// Remove a member from a set.
    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<()>;

    /// Read all members of a set, in no particular order.
    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Create a key with a bounded lifetime only if it does not already
    /// exist. Returns true when this call created the key.
    async fn put_if_absent(&self, key: &str, value: String, ttl: Duration) -> StoreResult<bool>;

    /// Apply (or refresh) a bounded lifetime on a key. No-op when absent.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    /// Delete a key. No-op when absent.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}
