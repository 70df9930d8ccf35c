//! Fixed-window counter records and their state transitions.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::add_duration;

/// The counter for one client key in its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    /// Requests admitted in this window
    pub count: u32,
    /// When the window closes
    pub reset_time: DateTime<Utc>,
}

impl WindowRecord {
    /// Open a new window at `now` holding one request.
    pub fn start(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 1,
            reset_time: add_duration(now, window),
        }
    }

    /// A window is closed from its reset time onwards.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_time
    }

    /// Requests still admissible in this window under `max_requests`.
    pub fn remaining(&self, max_requests: u32) -> u32 {
        max_requests.saturating_sub(self.count)
    }

    /// Time left until the window closes, zero once expired.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_time - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Result of applying one request to a key's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    /// Whether the request is admitted
    pub allowed: bool,
    /// The window after the request was applied
    pub record: WindowRecord,
    /// Whether this request opened a new window
    pub new_window: bool,
}

/// Apply one request to the key's current record.
///
/// - no record, or an expired one: open a new window with count 1 and admit
/// - count below the cap: increment and admit
/// - count at the cap: deny and leave the count untouched
pub fn register_hit(
    current: Option<WindowRecord>,
    now: DateTime<Utc>,
    window: Duration,
    max_requests: u32,
) -> HitOutcome {
    match current.filter(|record| !record.is_expired(now)) {
        None => HitOutcome {
            allowed: true,
            record: WindowRecord::start(now, window),
            new_window: true,
        },
        Some(mut record) if record.count < max_requests => {
            record.count += 1;
            HitOutcome {
                allowed: true,
                record,
                new_window: false,
            }
        }
        Some(record) => HitOutcome {
            allowed: false,
            record,
            new_window: false,
        },
    }
}
