//! Cart line items and product snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product attributes copied into the cart at the time of adding.
///
/// Later catalog price changes do not reach items already in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Product (variant) identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Unit price at the time of adding
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// List price before discount, if the product was on sale
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub original_price: Option<Decimal>,
    /// Image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Catalog category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ProductSnapshot {
    /// Create a snapshot with the required attributes.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            original_price: None,
            image: None,
            category: None,
        }
    }

    /// Set the pre-discount list price.
    pub fn with_original_price(mut self, original_price: Decimal) -> Self {
        self.original_price = Some(original_price);
        self
    }

    /// Set the image reference.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the catalog category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The list price, falling back to the selling price.
    pub fn list_price(&self) -> Decimal {
        self.original_price.unwrap_or(self.price)
    }
}

/// One product-quantity pair in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Line identifier; equal to the product id
    pub id: String,
    /// Product attributes as of the first add
    pub product: ProductSnapshot,
    /// Always at least 1 while the item is in the cart
    pub quantity: u32,
    /// When the product first entered the cart
    pub added_at: DateTime<Utc>,
}

impl CartLineItem {
    /// Create a line item for `product`.
    pub fn new(product: ProductSnapshot, quantity: u32, added_at: DateTime<Utc>) -> Self {
        Self {
            id: product.id.clone(),
            product,
            quantity,
            added_at,
        }
    }

    /// Selling price times quantity, `None` if it does not fit a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.product.price.checked_mul(Decimal::from(self.quantity))
    }

    /// List price times quantity, `None` if it does not fit a `Decimal`.
    pub fn original_line_total(&self) -> Option<Decimal> {
        self.product.list_price().checked_mul(Decimal::from(self.quantity))
    }
}
