//! Read-only product catalog used to denormalize cart lines.
//!
//! Catalog management lives outside this service. The storefront only needs a
//! lookup from product ID to display data and unit price, loaded once at
//! startup from a JSON file:
//!
//! ```json
//! {
//!   "products": [
//!     {
//!       "id": "linen-tee",
//!       "name": "Linen Tee",
//!       "image": "https://cdn.example.com/tee.jpg",
//!       "sku": "PT-001",
//!       "price": { "amount": "24.00", "currency_code": "USD" }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use cartbridge_core::{CurrencyCode, Price, PriceError, ProductId, ProductSnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("product {0} is listed more than once")]
    Duplicate(ProductId),
    #[error("product {product}: {source}")]
    InvalidPrice {
        product: ProductId,
        #[source]
        source: PriceError,
    },
    #[error("product {product} is priced in {found:?}, catalog uses {expected:?}")]
    MixedCurrency {
        product: ProductId,
        expected: CurrencyCode,
        found: CurrencyCode,
    },
}

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Primary image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Stock keeping unit.
    #[serde(default)]
    pub sku: Option<String>,
    /// Current unit price.
    pub price: Price,
}

impl CatalogProduct {
    /// Data captured on a cart line when this product is added.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            image: self.image.clone(),
            sku: self.sku.clone(),
        }
    }
}

/// Product lookup.
pub trait Catalog: Send + Sync {
    /// Look up a product by ID.
    fn product(&self, id: &ProductId) -> Option<CatalogProduct>;
}

#[derive(Deserialize)]
struct CatalogFile {
    products: Vec<CatalogProduct>,
}

/// A catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: HashMap<ProductId, CatalogProduct>,
}

impl StaticCatalog {
    /// Build a catalog from a list of products.
    ///
    /// # Errors
    ///
    /// Returns an error if a product ID repeats, a price is negative, or
    /// products are priced in more than one currency.
    pub fn from_products(products: Vec<CatalogProduct>) -> Result<Self, CatalogError> {
        let expected = products
            .first()
            .map(|product| product.price.currency_code);
        let mut map = HashMap::with_capacity(products.len());

        for product in products {
            Price::try_new(product.price.amount, product.price.currency_code).map_err(
                |source| CatalogError::InvalidPrice {
                    product: product.id.clone(),
                    source,
                },
            )?;

            if let Some(expected) = expected
                && product.price.currency_code != expected
            {
                return Err(CatalogError::MixedCurrency {
                    product: product.id,
                    expected,
                    found: product.price.currency_code,
                });
            }

            if map.contains_key(&product.id) {
                return Err(CatalogError::Duplicate(product.id));
            }
            map.insert(product.id.clone(), product);
        }

        Ok(Self { products: map })
    }

    /// Parse a catalog from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_products(file.products)
    }

    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Catalog for StaticCatalog {
    fn product(&self, id: &ProductId) -> Option<CatalogProduct> {
        self.products.get(id).cloned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "products": [
            { "id": "tee", "name": "Linen Tee", "sku": "PT-001",
              "price": { "amount": "24.00", "currency_code": "USD" } },
            { "id": "mug", "name": "Stoneware Mug",
              "price": { "amount": "12.50", "currency_code": "USD" } }
        ]
    }"#;

    #[test]
    fn test_from_json_str() {
        let catalog = StaticCatalog::from_json_str(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);

        let tee = catalog.product(&ProductId::parse("tee").unwrap()).unwrap();
        assert_eq!(tee.name, "Linen Tee");
        assert_eq!(tee.snapshot().sku.as_deref(), Some("PT-001"));
        assert!(catalog.product(&ProductId::parse("hat").unwrap()).is_none());
    }

    #[test]
    fn test_rejects_duplicate_product() {
        let json = r#"{ "products": [
            { "id": "tee", "name": "A", "price": { "amount": "1.00" } },
            { "id": "tee", "name": "B", "price": { "amount": "2.00" } }
        ] }"#;
        assert!(matches!(
            StaticCatalog::from_json_str(json),
            Err(CatalogError::Duplicate(_))
        ));
    }

    #[test]
    fn test_rejects_negative_price() {
        let json = r#"{ "products": [
            { "id": "tee", "name": "A", "price": { "amount": "-1.00" } }
        ] }"#;
        assert!(matches!(
            StaticCatalog::from_json_str(json),
            Err(CatalogError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_rejects_mixed_currency() {
        let json = r#"{ "products": [
            { "id": "tee", "name": "A", "price": { "amount": "1.00", "currency_code": "USD" } },
            { "id": "mug", "name": "B", "price": { "amount": "1.00", "currency_code": "EUR" } }
        ] }"#;
        assert!(matches!(
            StaticCatalog::from_json_str(json),
            Err(CatalogError::MixedCurrency { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            StaticCatalog::from_json_str("{"),
            Err(CatalogError::Parse(_))
        ));
    }
}
