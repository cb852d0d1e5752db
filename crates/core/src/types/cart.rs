//! Cart line items and immutable cart snapshots.
//!
//! A [`CartSnapshot`] is the unit of exchange between the cart stores and the
//! reconciliation engine. Its derived figures are computed once, at
//! construction, from the line items; they are never accepted from outside.
//! Deserialization goes through [`CartSnapshotWire`], which drops any
//! transmitted totals and rebuilds them.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartItemId, ProductId};
use super::price::{CurrencyCode, Price};
use super::quantity::Quantity;

/// Errors raised when a snapshot fails boundary validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartDataError {
    /// The same product appears on more than one line.
    #[error("duplicate line for product {0}")]
    DuplicateProduct(ProductId),
    /// Lines are priced in different currencies.
    #[error("line for product {product} is priced in {found:?}, cart uses {expected:?}")]
    MixedCurrency {
        /// Offending product.
        product: ProductId,
        /// Currency of the first line.
        expected: CurrencyCode,
        /// Currency of the offending line.
        found: CurrencyCode,
    },
    /// A unit price, tax or shipping amount was negative.
    #[error("{0} cannot be negative")]
    NegativeAmount(&'static str),
}

/// Product data denormalized into a cart line at add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Display name.
    pub name: String,
    /// Primary image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Stock keeping unit.
    #[serde(default)]
    pub sku: Option<String>,
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Line ID, local to the store that owns the line.
    pub id: CartItemId,
    /// Product on this line. Unique within a cart.
    pub product_id: ProductId,
    /// Number of units.
    pub quantity: Quantity,
    /// Price of one unit.
    pub unit_price: Price,
    /// Product data captured when the line was created.
    pub product: ProductSnapshot,
}

impl CartItem {
    /// Create a new line with a fresh line ID.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        quantity: Quantity,
        unit_price: Price,
        product: ProductSnapshot,
    ) -> Self {
        Self {
            id: CartItemId::generate(),
            product_id,
            quantity,
            unit_price,
            product,
        }
    }

    /// Price of the whole line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity.get())
    }
}

/// The minimal line description sent to the authenticated store on merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeLine {
    /// Product to merge.
    pub product_id: ProductId,
    /// Quantity held in the guest cart.
    pub quantity: Quantity,
}

/// An immutable view of a cart at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CartSnapshotWire")]
pub struct CartSnapshot {
    items: Vec<CartItem>,
    currency_code: CurrencyCode,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    item_count: u64,
}

/// Wire shape accepted when deserializing a [`CartSnapshot`].
///
/// Only the line items, tax and shipping are read; `subtotal`, `total` and
/// `item_count` are ignored if present.
#[derive(Debug, Deserialize)]
pub struct CartSnapshotWire {
    #[serde(default)]
    items: Vec<CartItem>,
    #[serde(default)]
    tax: Decimal,
    #[serde(default)]
    shipping: Decimal,
    #[serde(default)]
    currency_code: Option<CurrencyCode>,
}

impl TryFrom<CartSnapshotWire> for CartSnapshot {
    type Error = CartDataError;

    fn try_from(wire: CartSnapshotWire) -> Result<Self, Self::Error> {
        let snapshot = Self::from_items(wire.items, wire.tax, wire.shipping)?;
        match wire.currency_code {
            Some(code) if snapshot.items.is_empty() => Ok(Self {
                currency_code: code,
                ..snapshot
            }),
            _ => Ok(snapshot),
        }
    }
}

impl Default for CartSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl CartSnapshot {
    /// A cart with no lines and all totals at zero.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            currency_code: CurrencyCode::default(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            total: Decimal::ZERO,
            item_count: 0,
        }
    }

    /// Build a snapshot from line items, deriving every total.
    ///
    /// # Errors
    ///
    /// Returns an error if a product appears twice, lines mix currencies, or
    /// any amount is negative.
    pub fn from_items(
        items: Vec<CartItem>,
        tax: Decimal,
        shipping: Decimal,
    ) -> Result<Self, CartDataError> {
        if tax.is_sign_negative() && !tax.is_zero() {
            return Err(CartDataError::NegativeAmount("tax"));
        }
        if shipping.is_sign_negative() && !shipping.is_zero() {
            return Err(CartDataError::NegativeAmount("shipping"));
        }

        let currency_code = items
            .first()
            .map_or_else(CurrencyCode::default, |item| item.unit_price.currency_code);

        let mut seen = HashSet::with_capacity(items.len());
        let mut subtotal = Decimal::ZERO;
        let mut item_count: u64 = 0;

        for item in &items {
            if !seen.insert(&item.product_id) {
                return Err(CartDataError::DuplicateProduct(item.product_id.clone()));
            }
            if item.unit_price.currency_code != currency_code {
                return Err(CartDataError::MixedCurrency {
                    product: item.product_id.clone(),
                    expected: currency_code,
                    found: item.unit_price.currency_code,
                });
            }
            if item.unit_price.amount.is_sign_negative() && !item.unit_price.amount.is_zero() {
                return Err(CartDataError::NegativeAmount("unit price"));
            }
            subtotal += item.line_total().amount;
            item_count += u64::from(item.quantity.get());
        }

        Ok(Self {
            items,
            currency_code,
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
            item_count,
        })
    }

    /// Line items in display order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Consume the snapshot, returning its line items.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    /// Find the line for a product.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Currency of every line in the cart.
    #[must_use]
    pub const fn currency_code(&self) -> CurrencyCode {
        self.currency_code
    }

    /// Sum of line totals.
    #[must_use]
    pub const fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Tax as supplied by the owning store.
    #[must_use]
    pub const fn tax(&self) -> Decimal {
        self.tax
    }

    /// Shipping as supplied by the owning store.
    #[must_use]
    pub const fn shipping(&self) -> Decimal {
        self.shipping
    }

    /// `subtotal + tax + shipping`.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Sum of line quantities.
    #[must_use]
    pub const fn item_count(&self) -> u64 {
        self.item_count
    }

    /// Lines to hand to the authenticated store when merging this cart.
    #[must_use]
    pub fn merge_lines(&self) -> Vec<MergeLine> {
        self.items
            .iter()
            .map(|item| MergeLine {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(product: &str, quantity: u32, cents: i64) -> CartItem {
        CartItem::new(
            ProductId::parse(product).unwrap(),
            Quantity::new(quantity).unwrap(),
            Price::new(Decimal::new(cents, 2), CurrencyCode::USD),
            ProductSnapshot {
                name: product.to_uppercase(),
                image: None,
                sku: None,
            },
        )
    }

    #[test]
    fn test_empty_snapshot_totals() {
        let empty = CartSnapshot::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.total(), Decimal::ZERO);
        assert_eq!(empty.item_count(), 0);
    }

    #[test]
    fn test_from_items_derives_totals() {
        let snapshot = CartSnapshot::from_items(
            vec![item("a", 2, 1000), item("b", 1, 250)],
            Decimal::new(100, 2),
            Decimal::new(500, 2),
        )
        .unwrap();

        assert_eq!(snapshot.subtotal(), Decimal::new(2250, 2));
        assert_eq!(snapshot.total(), Decimal::new(2850, 2));
        assert_eq!(snapshot.item_count(), 3);
    }

    #[test]
    fn test_from_items_rejects_duplicate_product() {
        let err = CartSnapshot::from_items(
            vec![item("a", 1, 100), item("a", 2, 100)],
            Decimal::ZERO,
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, CartDataError::DuplicateProduct(_)));
    }

    #[test]
    fn test_from_items_rejects_mixed_currency() {
        let mut euro = item("b", 1, 100);
        euro.unit_price.currency_code = CurrencyCode::EUR;
        let err = CartSnapshot::from_items(vec![item("a", 1, 100), euro], Decimal::ZERO, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, CartDataError::MixedCurrency { .. }));
    }

    #[test]
    fn test_deserialize_ignores_transmitted_totals() {
        let original =
            CartSnapshot::from_items(vec![item("a", 2, 300)], Decimal::ZERO, Decimal::ZERO).unwrap();
        let mut json = serde_json::to_value(&original).unwrap();
        json["total"] = serde_json::json!("999.00");
        json["item_count"] = serde_json::json!(42);

        let parsed: CartSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.total(), Decimal::new(600, 2));
        assert_eq!(parsed.item_count(), 2);
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_deserialize_rejects_duplicate_lines() {
        let a = serde_json::to_value(item("a", 1, 100)).unwrap();
        let json = serde_json::json!({ "items": [a.clone(), a] });
        assert!(serde_json::from_value::<CartSnapshot>(json).is_err());
    }

    #[test]
    fn test_merge_lines() {
        let snapshot =
            CartSnapshot::from_items(vec![item("a", 2, 100)], Decimal::ZERO, Decimal::ZERO).unwrap();
        let lines = snapshot.merge_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id.as_str(), "a");
        assert_eq!(lines[0].quantity.get(), 2);
    }
}
