//! The cart store: owned, persisted collection of line items.

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::storage::{PersistedSlot, StorageBackend};

use super::events::{CartEvent, EventBus, Notice, NoticeLevel, Subscription};
use super::item::{CartLineItem, ProductSnapshot};
use super::summary::{calculate_summary, CartSummary, PricingPolicy};

/// Default slot name for the cart collection.
pub const DEFAULT_CART_KEY: &str = "cart";

/// Owns the shopper's cart.
///
/// The collection is hydrated from storage when the store is opened and
/// written back in full after every mutation. Storage faults never reach
/// the caller: a bad read starts an empty cart, a failed write keeps the
/// in-memory state and publishes a warning notice.
#[derive(Debug)]
pub struct CartStore {
    slot: PersistedSlot<Vec<CartLineItem>>,
    items: Vec<CartLineItem>,
    pricing: PricingPolicy,
    events: EventBus<CartEvent>,
    clock: Arc<dyn Clock>,
}

impl CartStore {
    /// Open the cart stored under [`DEFAULT_CART_KEY`] with default pricing.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_options(
            backend,
            DEFAULT_CART_KEY,
            PricingPolicy::default(),
            Arc::new(SystemClock),
        )
    }

    /// Open a cart with an explicit slot name, pricing policy and clock.
    pub fn with_options(
        backend: Arc<dyn StorageBackend>,
        key: &str,
        pricing: PricingPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let slot = PersistedSlot::new(backend, key);
        let items = hydrate(&slot);
        info!(key = key, items = items.len(), "Cart store opened");

        Self {
            slot,
            items,
            pricing,
            events: EventBus::new(),
            clock,
        }
    }

    /// Re-read the collection from storage, picking up writes made by
    /// another store sharing the same slot. Subscribers are notified.
    pub fn reload(&mut self) -> &[CartLineItem] {
        self.items = hydrate(&self.slot);
        self.publish_update();
        &self.items
    }

    /// Current line items in insertion order.
    pub fn get_cart(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line for the same product has its quantity increased;
    /// its snapshot and `added_at` are left as they were. Adding zero
    /// units changes nothing.
    pub fn add_to_cart(&mut self, product: &ProductSnapshot, quantity: u32) -> &[CartLineItem] {
        if quantity == 0 {
            trace!(product_id = %product.id, "Ignoring add of zero units");
            return &self.items;
        }

        match self.items.iter_mut().find(|item| item.id == product.id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity);
                debug!(
                    product_id = %product.id,
                    quantity = item.quantity,
                    "Increased cart line quantity"
                );
            }
            None => {
                let item = CartLineItem::new(product.clone(), quantity, self.clock.now());
                debug!(product_id = %product.id, quantity = quantity, "Added cart line");
                self.items.push(item);
            }
        }

        self.commit();
        self.events.emit(&CartEvent::Notice(Notice::new(
            NoticeLevel::Success,
            format!("Added {} to cart", product.name),
        )));
        &self.items
    }

    /// Set the quantity of line `item_id`. A quantity of zero or less
    /// removes the line; an unknown id is a no-op. Setting the current
    /// quantity still persists and notifies.
    pub fn update_quantity(&mut self, item_id: &str, quantity: i64) -> &[CartLineItem] {
        if quantity <= 0 {
            return self.remove_from_cart(item_id);
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let Some(item) = self.items.iter_mut().find(|item| item.id == item_id) else {
            trace!(item_id = item_id, "Quantity update for unknown cart line");
            return &self.items;
        };

        item.quantity = quantity;
        debug!(item_id = item_id, quantity = quantity, "Updated cart line quantity");

        self.commit();
        &self.items
    }

    /// Remove line `item_id`. Removing an absent line is a no-op.
    pub fn remove_from_cart(&mut self, item_id: &str) -> &[CartLineItem] {
        let Some(position) = self.items.iter().position(|item| item.id == item_id) else {
            trace!(item_id = item_id, "Removal of unknown cart line");
            return &self.items;
        };

        let removed = self.items.remove(position);
        debug!(item_id = item_id, "Removed cart line");

        self.commit();
        self.events.emit(&CartEvent::Notice(Notice::new(
            NoticeLevel::Info,
            format!("Removed {} from cart", removed.product.name),
        )));
        &self.items
    }

    /// Empty the cart.
    pub fn clear_cart(&mut self) -> &[CartLineItem] {
        self.items.clear();
        debug!("Cleared cart");

        self.commit();
        self.events.emit(&CartEvent::Notice(Notice::new(
            NoticeLevel::Info,
            "Cart cleared",
        )));
        &self.items
    }

    /// Whether a line for `product_id` is in the cart.
    pub fn is_in_cart(&self, product_id: &str) -> bool {
        self.items.iter().any(|item| item.id == product_id)
    }

    /// Quantity of `product_id` in the cart, 0 if absent.
    pub fn get_item_quantity(&self, product_id: &str) -> u32 {
        self.items
            .iter()
            .find(|item| item.id == product_id)
            .map_or(0, |item| item.quantity)
    }

    /// Totals for the current collection.
    pub fn summary(&self) -> CartSummary {
        calculate_summary(&self.items, &self.pricing)
    }

    /// The pricing policy used by [`CartStore::summary`].
    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Listen for cart events.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CartEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    fn commit(&self) {
        if let Err(e) = self.slot.save(&self.items) {
            warn!(key = %self.slot.key(), error = %e, "Failed to persist cart");
            self.events.emit(&CartEvent::Notice(Notice::new(
                NoticeLevel::Warning,
                "Your cart could not be saved on this device",
            )));
        }
        self.publish_update();
    }

    fn publish_update(&self) {
        self.events.emit(&CartEvent::Updated {
            items: self.items.clone(),
        });
    }
}

/// Load the collection, discarding unreadable data and repairing lines that
/// break the one-line-per-product, quantity-at-least-one invariant.
///
/// Line ids are taken from the product snapshot, and lines whose totals do
/// not fit a `Decimal` are dropped.
fn hydrate(slot: &PersistedSlot<Vec<CartLineItem>>) -> Vec<CartLineItem> {
    let stored = match slot.load() {
        Ok(Some(items)) => items,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(key = %slot.key(), error = %e, "Discarding unreadable cart data");
            return Vec::new();
        }
    };

    let stored_len = stored.len();
    let mut relabelled = 0usize;
    let mut items: Vec<CartLineItem> = Vec::with_capacity(stored_len);
    for mut item in stored.into_iter().filter(|item| item.quantity > 0) {
        if item.id != item.product.id {
            item.id = item.product.id.clone();
            relabelled += 1;
        }
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
                existing.added_at = existing.added_at.min(item.added_at);
            }
            None => items.push(item),
        }
    }

    items.retain(|item| {
        let fits = item.line_total().is_some() && item.original_line_total().is_some();
        if !fits {
            warn!(
                key = %slot.key(),
                item_id = %item.id,
                quantity = item.quantity,
                "Dropping stored cart line whose total overflows"
            );
        }
        fits
    });

    if items.len() != stored_len || relabelled > 0 {
        warn!(
            key = %slot.key(),
            stored = stored_len,
            kept = items.len(),
            relabelled = relabelled,
            "Repaired stored cart lines"
        );
    }
    items
}
