//! Key-value persistence for chatroom histories and the chatroom registry
//!
//! The store is small: string keys, string values, synchronous
//! get/set. One file per key on disk, or a map in memory.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;
use std::sync::Arc;

/// Errors raised by a [`KeyValueStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Synchronous string key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Shared handle passed to controllers and the registry.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Storage key for a chatroom's message history.
pub fn history_key(chatroom_id: &str) -> String {
    format!("chatroom_{}", chatroom_id)
}
