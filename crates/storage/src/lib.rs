//! Key-value persistence for the minting worker
//!
//! Every invocation of the worker is stateless; all state that must survive
//! between invocations of one minting day lives behind the [`KeyValueStore`]
//! trait. [`EpochStore`] layers a typed key schema and JSON value codec on
//! top, scoped to a single day, so raw key strings never leak into worker
//! logic.

use async_trait::async_trait;
use thiserror::Error;

mod file;
mod keys;
mod memory;

pub use file::FileStore;
pub use keys::{EpochStore, StateKey};
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("corrupt value for {key}: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

/// Minimal string key-value contract every backend implements.
///
/// Keys are `/`-separated paths whose first segment is the minting-day
/// timestamp, which is what makes prefix-scoped cleanup possible.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
    async fn keys(&self) -> Result<Vec<String>, StorageError>;
}
