//! One limiter per endpoint category.

use std::sync::Arc;

use http::HeaderMap;
use tracing::info;

use crate::clock::{Clock, SystemClock};

use super::limiter::RateLimiter;
use super::response::RateLimitDecision;
use super::rules::{LimitPolicy, RateLimitRules};
use super::store::InMemoryWindowStore;

/// The pre-configured limiters for the storefront's route groups.
///
/// Every limiter owns a separate window store, so a client's search
/// traffic never counts against its sign-in attempts.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    api: RateLimiter,
    search: RateLimiter,
    recommendations: RateLimiter,
    auth: RateLimiter,
}

impl RateLimiterRegistry {
    /// Build limiters for `rules` on the system clock.
    pub fn from_rules(rules: &RateLimitRules) -> Self {
        Self::with_clock(rules, Arc::new(SystemClock))
    }

    /// Build limiters for `rules` reading time from `clock`.
    pub fn with_clock(rules: &RateLimitRules, clock: Arc<dyn Clock>) -> Self {
        let build = |policy: LimitPolicy| {
            let rule = rules.rule(policy);
            info!(
                policy = %policy,
                window_ms = rule.window_ms,
                max_requests = rule.max_requests.get(),
                "Configured rate limiter"
            );
            RateLimiter::new(rule.clone())
                .named(policy.as_str())
                .with_store(Arc::new(InMemoryWindowStore::new()))
                .with_clock(Arc::clone(&clock))
        };

        Self {
            api: build(LimitPolicy::Api),
            search: build(LimitPolicy::Search),
            recommendations: build(LimitPolicy::Recommendations),
            auth: build(LimitPolicy::Auth),
        }
    }

    /// The limiter guarding `policy`.
    pub fn limiter(&self, policy: LimitPolicy) -> &RateLimiter {
        match policy {
            LimitPolicy::Api => &self.api,
            LimitPolicy::Search => &self.search,
            LimitPolicy::Recommendations => &self.recommendations,
            LimitPolicy::Auth => &self.auth,
        }
    }

    /// Check a request against the limiter for `policy`.
    pub async fn check(&self, policy: LimitPolicy, headers: &HeaderMap) -> RateLimitDecision {
        self.limiter(policy).check_limit(headers).await
    }
}

impl Default for RateLimiterRegistry {
    fn default() -> Self {
        Self::from_rules(&RateLimitRules::default())
    }
}
