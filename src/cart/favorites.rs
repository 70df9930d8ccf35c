//! Favorited product ids, persisted in their own slot.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::{PersistedSlot, StorageBackend};

use super::events::{EventBus, FavoritesEvent, Notice, NoticeLevel, Subscription};

/// Default slot name for the favorites list.
pub const DEFAULT_FAVORITES_KEY: &str = "favorites";

/// Ordered, duplicate-free list of favorited product ids.
#[derive(Debug)]
pub struct FavoritesStore {
    slot: PersistedSlot<Vec<String>>,
    ids: Vec<String>,
    events: EventBus<FavoritesEvent>,
}

impl FavoritesStore {
    /// Open the favorites stored under [`DEFAULT_FAVORITES_KEY`].
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_key(backend, DEFAULT_FAVORITES_KEY)
    }

    /// Open the favorites stored under `key`.
    pub fn with_key(backend: Arc<dyn StorageBackend>, key: &str) -> Self {
        let slot = PersistedSlot::new(backend, key);
        let ids = match slot.load() {
            Ok(Some(mut ids)) => {
                dedup_in_order(&mut ids);
                ids
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = key, error = %e, "Discarding unreadable favorites data");
                Vec::new()
            }
        };

        Self {
            slot,
            ids,
            events: EventBus::new(),
        }
    }

    /// Favorited ids, oldest first.
    pub fn favorites(&self) -> &[String] {
        &self.ids
    }

    pub fn is_favorite(&self, product_id: &str) -> bool {
        self.ids.iter().any(|id| id == product_id)
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// Favorite `product_id`. Returns `false` if it already was.
    pub fn add(&mut self, product_id: &str) -> bool {
        if self.is_favorite(product_id) {
            return false;
        }
        self.ids.push(product_id.to_string());
        debug!(product_id = product_id, "Added favorite");
        self.commit();
        true
    }

    /// Unfavorite `product_id`. Returns `false` if it was not a favorite.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| id != product_id);
        if self.ids.len() == before {
            return false;
        }
        debug!(product_id = product_id, "Removed favorite");
        self.commit();
        true
    }

    /// Flip the favorite state of `product_id`, returning the new state.
    pub fn toggle(&mut self, product_id: &str) -> bool {
        if self.remove(product_id) {
            false
        } else {
            self.add(product_id)
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.commit();
    }

    /// Listen for favorites events.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&FavoritesEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    fn commit(&self) {
        if let Err(e) = self.slot.save(&self.ids) {
            warn!(key = %self.slot.key(), error = %e, "Failed to persist favorites");
            self.events.emit(&FavoritesEvent::Notice(Notice::new(
                NoticeLevel::Warning,
                "Your favorites could not be saved on this device",
            )));
        }
        self.events.emit(&FavoritesEvent::Updated {
            ids: self.ids.clone(),
        });
    }
}

fn dedup_in_order(ids: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}
