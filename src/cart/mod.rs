//! Client-side shopping cart and favorites.
//!
//! [`CartStore`] owns the ordered list of line items and keeps it mirrored
//! into a [`PersistedSlot`](crate::storage::PersistedSlot). Every mutation
//! writes the whole collection back and notifies subscribers. Totals are
//! derived on demand by [`calculate_summary`].

mod events;
mod favorites;
mod item;
mod store;
mod summary;

pub use events::{CartEvent, EventBus, FavoritesEvent, Notice, NoticeLevel, Subscription};
pub use favorites::{FavoritesStore, DEFAULT_FAVORITES_KEY};
pub use item::{CartLineItem, ProductSnapshot};
pub use store::{CartStore, DEFAULT_CART_KEY};
pub use summary::{calculate_summary, CartSummary, PricingPolicy};
