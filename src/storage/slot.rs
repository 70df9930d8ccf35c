//! Typed JSON slots over a storage backend.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{StorageBackend, StorageError};

/// A single named slot holding a JSON-encoded `T`.
pub struct PersistedSlot<T> {
    backend: Arc<dyn StorageBackend>,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for PersistedSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedSlot")
            .field("key", &self.key)
            .field("backend", &self.backend)
            .finish()
    }
}

impl<T> PersistedSlot<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Bind a slot named `key` on `backend`.
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            _marker: PhantomData,
        }
    }

    /// The slot name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load and decode the slot. An empty slot yields `Ok(None)`.
    pub fn load(&self) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Malformed {
                key: self.key.clone(),
                source,
            })
    }

    /// Encode and store `value`, replacing the previous contents.
    pub fn save(&self, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.backend.set(&self.key, &raw)
    }

    /// Empty the slot.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove(&self.key)
    }
}
