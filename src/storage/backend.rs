//! Storage backend trait and the in-memory implementation.

use std::collections::HashMap;
use std::fmt::Debug;

use parking_lot::Mutex;
use tracing::trace;

use super::StorageError;

/// A flat namespace of string slots.
///
/// Implementations must be safe to share between threads; the stores that
/// sit on top of them never hold a backend lock across calls.
pub trait StorageBackend: Send + Sync + Debug {
    /// Read the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value stored under `key`. Absent keys are not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage, optionally bounded by a total byte quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create an unbounded in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory storage that rejects writes once the combined
    /// size of all keys and values would exceed `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock();

        if let Some(quota) = self.quota {
            let others: usize = slots
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        trace!(key = key, bytes = value.len(), "Writing memory slot");
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.slots.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("cart").unwrap(), None);

        storage.set("cart", "[]").unwrap();
        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("[]"));
        assert_eq!(storage.len(), 1);

        storage.remove("cart").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_remove_absent_key_is_ok() {
        let storage = MemoryStorage::new();
        assert!(storage.remove("missing").is_ok());
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let storage = MemoryStorage::with_quota(10);

        storage.set("k", "12345").unwrap();
        let err = storage.set("other", "123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 10, .. }));

        // The rejected write leaves existing data alone
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("12345"));
    }

    #[test]
    fn test_quota_counts_replacement_not_sum() {
        let storage = MemoryStorage::with_quota(10);

        storage.set("k", "123456789").unwrap();
        // Overwriting the same key only counts the new value
        storage.set("k", "987654321").unwrap();
        assert_eq!(storage.used_bytes(), 10);
    }
}
