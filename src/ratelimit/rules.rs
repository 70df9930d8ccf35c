//! Rate limit policy table.
//!
//! Each endpoint category gets its own limiter with its own window and
//! cap. The table can be overridden from YAML:
//!
//! ```yaml
//! search:
//!   window_ms: 60000
//!   max_requests: 30
//! auth:
//!   window_ms: 900000
//!   max_requests: 5
//!   message: Too many sign-in attempts
//! ```

use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, StorefrontError};

/// Message returned with a denial when a rule does not set its own.
pub const DEFAULT_DENIAL_MESSAGE: &str = "Too many requests, please try again later.";

/// Endpoint categories with their own limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPolicy {
    /// General API routes
    Api,
    /// Product search
    Search,
    /// AI recommendation copy
    Recommendations,
    /// Sign-in, sign-up and password reset
    Auth,
}

impl LimitPolicy {
    /// Every policy, in table order.
    pub const ALL: [LimitPolicy; 4] = [
        LimitPolicy::Api,
        LimitPolicy::Search,
        LimitPolicy::Recommendations,
        LimitPolicy::Auth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitPolicy::Api => "api",
            LimitPolicy::Search => "search",
            LimitPolicy::Recommendations => "recommendations",
            LimitPolicy::Auth => "auth",
        }
    }
}

impl fmt::Display for LimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitPolicy {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self> {
        LimitPolicy::ALL
            .into_iter()
            .find(|policy| policy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StorefrontError::UnknownPolicy(s.to_string()))
    }
}

/// Window and cap for one limiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRule {
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Requests admitted per window
    pub max_requests: NonZeroU32,
    /// Message returned with denials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LimitRule {
    /// Create a rule with the default denial message.
    pub fn new(window: Duration, max_requests: NonZeroU32) -> Self {
        Self {
            window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
            max_requests,
            message: None,
        }
    }

    /// Set the denial message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_DENIAL_MESSAGE)
    }

    fn validate(&self, policy: LimitPolicy) -> Result<()> {
        if self.window_ms == 0 {
            return Err(StorefrontError::Config(format!(
                "rate limit policy '{policy}' has a zero-length window"
            )));
        }
        Ok(())
    }
}

fn cap(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

fn default_api_rule() -> LimitRule {
    LimitRule::new(Duration::from_secs(60), cap(100))
}

fn default_search_rule() -> LimitRule {
    LimitRule::new(Duration::from_secs(60), cap(30))
        .with_message("Too many search requests, please slow down.")
}

fn default_recommendations_rule() -> LimitRule {
    LimitRule::new(Duration::from_secs(60), cap(10))
        .with_message("Too many recommendation requests, please try again shortly.")
}

fn default_auth_rule() -> LimitRule {
    LimitRule::new(Duration::from_secs(15 * 60), cap(5))
        .with_message("Too many authentication attempts, please try again later.")
}

/// The full policy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRules {
    #[serde(default = "default_api_rule")]
    pub api: LimitRule,
    #[serde(default = "default_search_rule")]
    pub search: LimitRule,
    #[serde(default = "default_recommendations_rule")]
    pub recommendations: LimitRule,
    #[serde(default = "default_auth_rule")]
    pub auth: LimitRule,
}

impl Default for RateLimitRules {
    fn default() -> Self {
        Self {
            api: default_api_rule(),
            search: default_search_rule(),
            recommendations: default_recommendations_rule(),
            auth: default_auth_rule(),
        }
    }
}

impl RateLimitRules {
    /// Load the table from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse the table from YAML. Policies left out keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rules: RateLimitRules = serde_yaml::from_str(yaml).map_err(|e| {
            StorefrontError::Config(format!("Failed to parse rate limit rules: {}", e))
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject rules that cannot be enforced.
    pub fn validate(&self) -> Result<()> {
        for policy in LimitPolicy::ALL {
            self.rule(policy).validate(policy)?;
        }
        Ok(())
    }

    /// The rule for `policy`.
    pub fn rule(&self, policy: LimitPolicy) -> &LimitRule {
        match policy {
            LimitPolicy::Api => &self.api,
            LimitPolicy::Search => &self.search,
            LimitPolicy::Recommendations => &self.recommendations,
            LimitPolicy::Auth => &self.auth,
        }
    }
}
