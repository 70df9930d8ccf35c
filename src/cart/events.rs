//! Change notifications for cart and favorites subscribers.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::item::CartLineItem;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A short user-facing message, e.g. a toast after adding to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Events published by [`CartStore`](super::CartStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// The collection changed; carries the full updated collection
    Updated { items: Vec<CartLineItem> },
    /// A message to show the shopper
    Notice(Notice),
}

/// Events published by [`FavoritesStore`](super::FavoritesStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoritesEvent {
    /// The favorite set changed; carries the full updated id list
    Updated { ids: Vec<String> },
    /// A message to show the shopper
    Notice(Notice),
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listeners<E> {
    next_id: u64,
    entries: Vec<(u64, Listener<E>)>,
}

/// Synchronous in-process publish/subscribe.
///
/// Listeners run on the publishing thread in subscription order. The
/// listener list is snapshotted before dispatch, so a listener may
/// subscribe or unsubscribe without deadlocking.
pub struct EventBus<E> {
    inner: Arc<Mutex<Listeners<E>>>,
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Number of attached listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Deliver `event` to every attached listener.
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .inner
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }
}

impl<E: 'static> EventBus<E> {
    /// Attach `listener`. It stays attached until the returned handle is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Listeners<E>>> = Arc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }
}

/// Handle to an attached listener. Dropping it detaches the listener.
#[must_use = "dropping a Subscription detaches its listener immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Detach the listener.
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
