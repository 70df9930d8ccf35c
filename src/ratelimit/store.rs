//! Window record storage.
//!
//! The limiter talks to its counters through [`WindowStore`], so an
//! external counter store can stand in for the in-process map.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::trace;

use super::counter::{register_hit, HitOutcome, WindowRecord};

/// Errors raised by window stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached or is not accepting operations
    #[error("Window store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for per-key window records.
#[async_trait]
pub trait WindowStore: Send + Sync + Debug {
    /// Apply one request for `key` atomically and return the outcome.
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
        max_requests: u32,
    ) -> Result<HitOutcome, StoreError>;

    /// The live record for `key`, ignoring expired ones.
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<WindowRecord>, StoreError>;

    /// Drop records whose window has closed. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Number of records currently held, expired or not.
    async fn len(&self) -> Result<usize, StoreError>;

    /// Drop every record.
    async fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Windows {
    records: HashMap<String, WindowRecord>,
    /// Reset times of opened windows, soonest first. An entry is stale when
    /// the key has since opened a later window.
    expiries: BinaryHeap<Reverse<(DateTime<Utc>, String)>>,
}

/// Process-local window store.
///
/// Purging pops only the windows that have closed, instead of scanning
/// every tracked key on each check.
#[derive(Debug, Default)]
pub struct InMemoryWindowStore {
    windows: Mutex<Windows>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
        max_requests: u32,
    ) -> Result<HitOutcome, StoreError> {
        let mut windows = self.windows.lock();

        let current = windows.records.get(key).copied();
        let outcome = register_hit(current, now, window, max_requests);

        if outcome.new_window {
            windows
                .expiries
                .push(Reverse((outcome.record.reset_time, key.to_string())));
        }
        windows.records.insert(key.to_string(), outcome.record);

        Ok(outcome)
    }

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<WindowRecord>, StoreError> {
        let windows = self.windows.lock();
        Ok(windows
            .records
            .get(key)
            .copied()
            .filter(|record| !record.is_expired(now)))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut windows = self.windows.lock();
        let mut purged = 0;

        while let Some(Reverse((reset_time, _))) = windows.expiries.peek() {
            if *reset_time > now {
                break;
            }
            let Some(Reverse((reset_time, key))) = windows.expiries.pop() else {
                break;
            };

            let current = windows.records.get(&key).map(|record| record.reset_time);
            if current == Some(reset_time) {
                windows.records.remove(&key);
                purged += 1;
            }
        }

        if purged > 0 {
            trace!(purged = purged, remaining = windows.records.len(), "Purged expired windows");
        }
        Ok(purged)
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.windows.lock().records.len())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut windows = self.windows.lock();
        windows.records.clear();
        windows.expiries.clear();
        Ok(())
    }
}
