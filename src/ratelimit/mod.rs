//! Fixed-window request limiting keyed by client identity.

mod counter;
mod key;
mod limiter;
mod registry;
mod response;
mod rules;
mod store;

pub use counter::{register_hit, HitOutcome, WindowRecord};
pub use key::{ClientAddressKey, KeyFn, KeyGenerator, UNKNOWN_CLIENT};
pub use limiter::RateLimiter;
pub use registry::RateLimiterRegistry;
pub use response::{
    RateLimitDecision, RateLimitErrorBody, RateLimitRejection, X_RATELIMIT_LIMIT,
    X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};
pub use rules::{LimitPolicy, LimitRule, RateLimitRules, DEFAULT_DENIAL_MESSAGE};
pub use store::{InMemoryWindowStore, StoreError, WindowStore};
