//! Durable key/value storage for client-side state.
//!
//! Storage is modelled after browser local storage: a flat namespace of
//! string slots. [`PersistedSlot`] layers typed JSON encoding on top and is
//! the persistence port used by the cart and favorites stores.

mod backend;
mod file;
mod slot;

pub use backend::{MemoryStorage, StorageBackend};
pub use file::FileStorage;
pub use slot::PersistedSlot;

use thiserror::Error;

/// Errors raised by storage backends and typed slots.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write would push the backend past its size quota
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} bytes allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    /// The stored value could not be decoded
    #[error("Malformed data in slot '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The value could not be encoded
    #[error("Failed to encode slot '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The slot key cannot be mapped onto the backend
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// I/O errors from file-backed storage
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
