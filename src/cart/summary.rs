//! Derived cart totals.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::item::CartLineItem;

/// Shipping and tax rules applied when summarising a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Subtotal at or above which shipping is free
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,

    /// Shipping charged below the threshold
    #[serde(default = "default_flat_shipping_rate")]
    pub flat_shipping_rate: Decimal,

    /// Tax as a fraction of the subtotal (0.08 = 8%)
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: default_free_shipping_threshold(),
            flat_shipping_rate: default_flat_shipping_rate(),
            tax_rate: default_tax_rate(),
        }
    }
}

fn default_free_shipping_threshold() -> Decimal {
    Decimal::from(100)
}

fn default_flat_shipping_rate() -> Decimal {
    Decimal::new(999, 2)
}

fn default_tax_rate() -> Decimal {
    Decimal::new(8, 2)
}

/// Totals derived from a set of line items. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub total_items: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub original_total_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_savings: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_total: Decimal,
}

/// Compute the summary for `items` under `policy`.
///
/// Pure: the same input always yields the same output. Amounts that do not
/// fit a `Decimal` saturate instead of panicking.
pub fn calculate_summary(items: &[CartLineItem], policy: &PricingPolicy) -> CartSummary {
    let total_items: u64 = items.iter().map(|item| u64::from(item.quantity)).sum();
    let total_price = saturating_total(items, |item| item.product.price);
    let original_total_price = saturating_total(items, |item| item.product.list_price());

    // A list price below the selling price is not a saving
    let total_savings = original_total_price
        .saturating_sub(total_price)
        .max(Decimal::ZERO);

    let estimated_shipping = if items.is_empty() || total_price >= policy.free_shipping_threshold {
        Decimal::ZERO
    } else {
        policy.flat_shipping_rate
    };

    let estimated_tax = round_money(total_price.saturating_mul(policy.tax_rate));
    let final_total = total_price
        .saturating_add(estimated_shipping)
        .saturating_add(estimated_tax);

    CartSummary {
        total_items,
        total_price,
        original_total_price,
        total_savings,
        estimated_shipping,
        estimated_tax,
        final_total,
    }
}

fn saturating_total(
    items: &[CartLineItem],
    unit_price: impl Fn(&CartLineItem) -> Decimal,
) -> Decimal {
    items.iter().fold(Decimal::ZERO, |total, item| {
        total.saturating_add(unit_price(item).saturating_mul(Decimal::from(item.quantity)))
    })
}

fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::ProductSnapshot;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, price: Decimal, original: Option<Decimal>, quantity: u32) -> CartLineItem {
        let mut product = ProductSnapshot::new(id, id, price);
        product.original_price = original;
        CartLineItem::new(
            product,
            quantity,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_empty_cart_summary() {
        let summary = calculate_summary(&[], &PricingPolicy::default());

        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.total_price, Decimal::ZERO);
        assert_eq!(summary.estimated_shipping, Decimal::ZERO);
        assert_eq!(summary.final_total, Decimal::ZERO);
    }

    #[test]
    fn test_summary_above_free_shipping_threshold() {
        let items = vec![item("p1", Decimal::from(100), None, 5)];
        let summary = calculate_summary(&items, &PricingPolicy::default());

        assert_eq!(summary.total_items, 5);
        assert_eq!(summary.total_price, Decimal::from(500));
        assert_eq!(summary.estimated_shipping, Decimal::ZERO);
        assert_eq!(summary.estimated_tax, Decimal::from(40));
        assert_eq!(summary.final_total, Decimal::from(540));
    }

    #[test]
    fn test_summary_below_threshold_charges_shipping() {
        let items = vec![item("bulb", Decimal::new(1999, 2), None, 2)];
        let summary = calculate_summary(&items, &PricingPolicy::default());

        assert_eq!(summary.total_price, Decimal::new(3998, 2));
        assert_eq!(summary.estimated_shipping, Decimal::new(999, 2));
        // 39.98 * 0.08 = 3.1984
        assert_eq!(summary.estimated_tax, Decimal::new(320, 2));
        assert_eq!(summary.final_total, Decimal::new(5317, 2));
    }

    #[test]
    fn test_summary_savings() {
        let items = vec![
            item("a", Decimal::from(80), Some(Decimal::from(100)), 2),
            item("b", Decimal::from(10), None, 1),
        ];
        let summary = calculate_summary(&items, &PricingPolicy::default());

        assert_eq!(summary.original_total_price, Decimal::from(210));
        assert_eq!(summary.total_price, Decimal::from(170));
        assert_eq!(summary.total_savings, Decimal::from(40));
    }

    #[test]
    fn test_summary_never_reports_negative_savings() {
        let items = vec![item("a", Decimal::from(50), Some(Decimal::from(40)), 1)];
        let summary = calculate_summary(&items, &PricingPolicy::default());

        assert_eq!(summary.total_savings, Decimal::ZERO);
    }

    #[test]
    fn test_summary_is_deterministic() {
        let items = vec![
            item("a", Decimal::new(1234, 2), None, 3),
            item("b", Decimal::new(99, 2), Some(Decimal::new(149, 2)), 7),
        ];
        let policy = PricingPolicy::default();

        assert_eq!(
            calculate_summary(&items, &policy),
            calculate_summary(&items, &policy)
        );
    }

    #[test]
    fn test_summary_saturates_instead_of_overflowing() {
        let huge = Decimal::from_scientific("5e28").unwrap();
        let items = vec![item("a", huge, None, 2), item("b", huge, None, 1)];
        let summary = calculate_summary(&items, &PricingPolicy::default());

        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_price, Decimal::MAX);
        assert_eq!(summary.total_savings, Decimal::ZERO);
        assert_eq!(summary.final_total, Decimal::MAX);
    }

    #[test]
    fn test_custom_policy() {
        let policy = PricingPolicy {
            free_shipping_threshold: Decimal::from(1000),
            flat_shipping_rate: Decimal::from(30),
            tax_rate: Decimal::new(10, 2),
        };
        let items = vec![item("p1", Decimal::from(100), None, 5)];
        let summary = calculate_summary(&items, &policy);

        assert_eq!(summary.estimated_shipping, Decimal::from(30));
        assert_eq!(summary.estimated_tax, Decimal::from(50));
        assert_eq!(summary.final_total, Decimal::from(580));
    }
}
