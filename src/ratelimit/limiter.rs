//! Core fixed-window rate limiter.

use std::fmt;
use std::sync::Arc;

use http::HeaderMap;
use tracing::{debug, instrument, trace, warn};

use crate::clock::{add_duration, Clock, SystemClock};

use super::counter::WindowRecord;
use super::key::{ClientAddressKey, KeyGenerator};
use super::response::RateLimitDecision;
use super::rules::LimitRule;
use super::store::{InMemoryWindowStore, WindowStore};

/// A fixed-window limiter for one endpoint category.
///
/// Each key's window opens on its first request and admits up to
/// `max_requests` until it closes. Two windows can abut, so a client can
/// get up to twice the cap through in a short burst across the boundary.
///
/// Store faults never block traffic: the request is allowed with the full
/// quota reported as remaining.
pub struct RateLimiter {
    name: String,
    rule: LimitRule,
    store: Arc<dyn WindowStore>,
    key_generator: Arc<dyn KeyGenerator>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("rule", &self.rule)
            .field("store", &self.store)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a limiter enforcing `rule` with an in-memory store, the
    /// system clock and client-address keys.
    pub fn new(rule: LimitRule) -> Self {
        Self {
            name: "default".to_string(),
            rule,
            store: Arc::new(InMemoryWindowStore::new()),
            key_generator: Arc::new(ClientAddressKey),
            clock: Arc::new(SystemClock),
        }
    }

    /// Name the limiter for logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Keep window records in `store`.
    pub fn with_store(mut self, store: Arc<dyn WindowStore>) -> Self {
        self.store = store;
        self
    }

    /// Derive client keys with `key_generator`.
    pub fn with_key_generator(mut self, key_generator: Arc<dyn KeyGenerator>) -> Self {
        self.key_generator = key_generator;
        self
    }

    /// Read time from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> &LimitRule {
        &self.rule
    }

    /// Check a request, keyed by its headers.
    pub async fn check_limit(&self, headers: &HeaderMap) -> RateLimitDecision {
        let key = self.key_generator.key(headers);
        self.check_key(&key).await
    }

    /// Check a request for an explicit client key.
    #[instrument(skip(self), fields(limiter = %self.name))]
    pub async fn check_key(&self, key: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let window = self.rule.window();
        let limit = self.rule.max_requests.get();

        match self.store.purge_expired(now).await {
            Ok(0) => {}
            Ok(purged) => trace!(purged = purged, "Purged expired windows"),
            Err(e) => debug!(error = %e, "Skipping purge of expired windows"),
        }

        let outcome = match self.store.hit(key, now, window, limit).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(key = key, error = %e, "Rate limit store failed, allowing request");
                return RateLimitDecision {
                    success: true,
                    limit,
                    remaining: limit,
                    reset_time: add_duration(now, window),
                    checked_at: now,
                    error: None,
                };
            }
        };

        let remaining = outcome.record.remaining(limit);
        if outcome.allowed {
            trace!(key = key, count = outcome.record.count, remaining = remaining, "Request allowed");
        } else {
            debug!(
                key = key,
                count = outcome.record.count,
                reset_time = %outcome.record.reset_time,
                "Rate limit exceeded"
            );
        }

        RateLimitDecision {
            success: outcome.allowed,
            limit,
            remaining,
            reset_time: outcome.record.reset_time,
            checked_at: now,
            error: (!outcome.allowed).then(|| self.rule.message().to_string()),
        }
    }

    /// The live window for `key`, if any.
    pub async fn window_for(&self, key: &str) -> Option<WindowRecord> {
        match self.store.get(key, self.clock.now()).await {
            Ok(record) => record,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read rate limit window");
                None
            }
        }
    }

    /// Number of keys the store is tracking.
    pub async fn tracked_keys(&self) -> usize {
        match self.store.len().await {
            Ok(len) => len,
            Err(e) => {
                warn!(limiter = %self.name, error = %e, "Failed to count rate limit windows");
                0
            }
        }
    }

    /// Forget every window.
    ///
    /// This is primarily useful for testing.
    pub async fn reset(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(limiter = %self.name, error = %e, "Failed to clear rate limit windows");
        }
    }
}
