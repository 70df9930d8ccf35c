//! Configuration management for the storefront core.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::cart::PricingPolicy;
use crate::error::{Result, StorefrontError};
use crate::ratelimit::RateLimitRules;

/// Prefix of environment overrides, e.g. `STOREFRONT__PRICING__TAX_RATE`.
pub const ENV_PREFIX: &str = "STOREFRONT";

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Client-side storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Shipping and tax rules
    #[serde(default)]
    pub pricing: PricingPolicy,

    /// Rate limit policy table
    #[serde(default)]
    pub rate_limits: RateLimitRules,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding file-backed storage slots
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Slot holding the cart
    #[serde(default = "default_cart_key")]
    pub cart_key: String,

    /// Slot holding favorited product ids
    #[serde(default = "default_favorites_key")]
    pub favorites_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cart_key: default_cart_key(),
            favorites_key: default_favorites_key(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".storefront")
}

fn default_cart_key() -> String {
    crate::cart::DEFAULT_CART_KEY.to_string()
}

fn default_favorites_key() -> String {
    crate::cart::DEFAULT_FAVORITES_KEY.to_string()
}

impl StorefrontConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: StorefrontConfig =
            serde_yaml::from_str(yaml).map_err(|e| StorefrontError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional YAML file layered under
    /// `STOREFRONT__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: StorefrontConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.pricing.tax_rate.is_sign_negative() {
            return Err(StorefrontError::Config("pricing.tax_rate must not be negative".into()));
        }
        if self.pricing.flat_shipping_rate.is_sign_negative() {
            return Err(StorefrontError::Config(
                "pricing.flat_shipping_rate must not be negative".into(),
            ));
        }
        if self.storage.cart_key == self.storage.favorites_key {
            return Err(StorefrontError::Config(
                "storage.cart_key and storage.favorites_key must differ".into(),
            ));
        }
        self.rate_limits.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();

        assert_eq!(config.storage.cart_key, "cart");
        assert_eq!(config.storage.favorites_key, "favorites");
        assert_eq!(config.pricing, PricingPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
storage:
  data_dir: /var/lib/storefront
pricing:
  tax_rate: 0.1
rate_limits:
  search:
    window_ms: 1000
    max_requests: 2
"#;
        let config = StorefrontConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/storefront"));
        assert_eq!(config.storage.cart_key, "cart");
        assert_eq!(config.pricing.tax_rate, Decimal::new(1, 1));
        assert_eq!(
            config.pricing.free_shipping_threshold,
            PricingPolicy::default().free_shipping_threshold
        );
        assert_eq!(config.rate_limits.search.max_requests.get(), 2);
        assert_eq!(config.rate_limits.auth, RateLimitRules::default().auth);
    }

    #[test]
    fn test_negative_tax_rejected() {
        let yaml = "pricing:\n  tax_rate: -0.05\n";
        assert!(matches!(
            StorefrontConfig::from_yaml(yaml),
            Err(StorefrontError::Config(_))
        ));
    }

    #[test]
    fn test_shared_slot_rejected() {
        let yaml = "storage:\n  cart_key: state\n  favorites_key: state\n";
        assert!(StorefrontConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "rate_limits:\n  auth:\n    window_ms: 30000\n    max_requests: 3").unwrap();

        let config = StorefrontConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.rate_limits.auth.max_requests.get(), 3);
        assert_eq!(config.rate_limits.api, RateLimitRules::default().api);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let result = StorefrontConfig::load(Some(missing.as_path()));
        assert!(matches!(result, Err(StorefrontError::Config(_))));
    }
}
