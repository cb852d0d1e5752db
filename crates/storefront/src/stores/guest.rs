//! Guest (anonymous) cart store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cartbridge_core::{CartDataError, CartItem, CartSnapshot, ProductId, Quantity, QuantityError};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::catalog::Catalog;

/// Errors from guest cart mutations. All of them are caller mistakes.
#[derive(Debug, Error)]
pub enum GuestCartError {
    /// The product is not in the catalog.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),
    /// The product has no line in the guest cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
    /// The line would exceed the quantity limit.
    #[error(transparent)]
    Quantity(#[from] QuantityError),
    /// The resulting cart failed validation.
    #[error("invalid cart: {0}")]
    Invalid(#[from] CartDataError),
}

/// The anonymous cart, kept on the shopper's side of the auth boundary.
///
/// Operations are synchronous and local. They fail only on invalid input.
pub trait GuestCartStore: Send + Sync {
    /// Current contents.
    fn snapshot(&self) -> CartSnapshot;

    /// Add units of a product, creating the line if needed.
    ///
    /// # Errors
    ///
    /// Returns `UnknownProduct` if the product does not exist.
    fn add(&self, product_id: &ProductId, quantity: Quantity)
    -> Result<CartSnapshot, GuestCartError>;

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `NotInCart` if there is no line for the product.
    fn update(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, GuestCartError>;

    /// Remove an existing line.
    ///
    /// # Errors
    ///
    /// Returns `NotInCart` if there is no line for the product.
    fn remove(&self, product_id: &ProductId) -> Result<CartSnapshot, GuestCartError>;

    /// Remove every line.
    fn clear(&self);
}

impl<T: GuestCartStore + ?Sized> GuestCartStore for Arc<T> {
    fn snapshot(&self) -> CartSnapshot {
        (**self).snapshot()
    }

    fn add(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, GuestCartError> {
        (**self).add(product_id, quantity)
    }

    fn update(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, GuestCartError> {
        (**self).update(product_id, quantity)
    }

    fn remove(&self, product_id: &ProductId) -> Result<CartSnapshot, GuestCartError> {
        (**self).remove(product_id)
    }

    fn clear(&self) {
        (**self).clear();
    }
}

/// In-process guest cart for one shopper.
///
/// Holds the current snapshot and replaces it wholesale on every mutation;
/// a rejected mutation leaves the previous snapshot in place.
pub struct MemoryGuestStore {
    catalog: Arc<dyn Catalog>,
    cart: Mutex<CartSnapshot>,
}

impl MemoryGuestStore {
    /// Create an empty guest cart backed by `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            cart: Mutex::new(CartSnapshot::empty()),
        }
    }

    fn cart(&self) -> MutexGuard<'_, CartSnapshot> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `edit` to a copy of the current lines and swap in the result.
    fn mutate(
        &self,
        edit: impl FnOnce(&mut Vec<CartItem>) -> Result<(), GuestCartError>,
    ) -> Result<CartSnapshot, GuestCartError> {
        let mut cart = self.cart();
        let mut items = cart.items().to_vec();
        edit(&mut items)?;
        let next = CartSnapshot::from_items(items, Decimal::ZERO, Decimal::ZERO)?;
        *cart = next.clone();
        Ok(next)
    }
}

impl GuestCartStore for MemoryGuestStore {
    fn snapshot(&self) -> CartSnapshot {
        self.cart().clone()
    }

    fn add(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, GuestCartError> {
        self.mutate(|items| {
            if let Some(line) = items.iter_mut().find(|i| &i.product_id == product_id) {
                line.quantity = line.quantity.checked_add(quantity)?;
                return Ok(());
            }
            let product = self
                .catalog
                .product(product_id)
                .ok_or_else(|| GuestCartError::UnknownProduct(product_id.clone()))?;
            items.push(CartItem::new(
                product_id.clone(),
                quantity,
                product.price,
                product.snapshot(),
            ));
            Ok(())
        })
    }

    fn update(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, GuestCartError> {
        self.mutate(|items| {
            let line = items
                .iter_mut()
                .find(|i| &i.product_id == product_id)
                .ok_or_else(|| GuestCartError::NotInCart(product_id.clone()))?;
            line.quantity = quantity;
            Ok(())
        })
    }

    fn remove(&self, product_id: &ProductId) -> Result<CartSnapshot, GuestCartError> {
        self.mutate(|items| {
            let before = items.len();
            items.retain(|i| &i.product_id != product_id);
            if items.len() == before {
                return Err(GuestCartError::NotInCart(product_id.clone()));
            }
            Ok(())
        })
    }

    fn clear(&self) {
        *self.cart() = CartSnapshot::empty();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cartbridge_core::{CurrencyCode, Price};

    use super::*;
    use crate::catalog::{CatalogProduct, StaticCatalog};

    fn pid(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn store() -> MemoryGuestStore {
        let catalog = StaticCatalog::from_products(vec![
            CatalogProduct {
                id: pid("tee"),
                name: "Tee".to_string(),
                image: None,
                sku: Some("T-1".to_string()),
                price: Price::new(Decimal::new(2000, 2), CurrencyCode::USD),
            },
            CatalogProduct {
                id: pid("mug"),
                name: "Mug".to_string(),
                image: None,
                sku: None,
                price: Price::new(Decimal::new(1000, 2), CurrencyCode::USD),
            },
        ])
        .unwrap();
        MemoryGuestStore::new(Arc::new(catalog))
    }

    #[test]
    fn test_add_denormalizes_product() {
        let store = store();
        let cart = store.add(&pid("tee"), qty(2)).unwrap();
        let line = cart.line(&pid("tee")).unwrap();
        assert_eq!(line.product.name, "Tee");
        assert_eq!(line.product.sku.as_deref(), Some("T-1"));
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total(), Decimal::new(4000, 2));
    }

    #[test]
    fn test_add_existing_line_sums_quantity() {
        let store = store();
        store.add(&pid("tee"), qty(1)).unwrap();
        let cart = store.add(&pid("tee"), qty(2)).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_past_line_maximum_leaves_cart_unchanged() {
        let store = store();
        store.add(&pid("tee"), qty(Quantity::MAX)).unwrap();
        let err = store.add(&pid("tee"), qty(1)).unwrap_err();
        assert!(matches!(err, GuestCartError::Quantity(QuantityError::TooLarge(_))));
        assert_eq!(store.snapshot().item_count(), u64::from(Quantity::MAX));
    }

    #[test]
    fn test_add_unknown_product_leaves_cart_unchanged() {
        let store = store();
        store.add(&pid("mug"), qty(1)).unwrap();
        let err = store.add(&pid("hat"), qty(1)).unwrap_err();
        assert!(matches!(err, GuestCartError::UnknownProduct(_)));
        assert_eq!(store.snapshot().item_count(), 1);
    }

    #[test]
    fn test_update_and_remove() {
        let store = store();
        store.add(&pid("tee"), qty(1)).unwrap();
        store.add(&pid("mug"), qty(1)).unwrap();

        let cart = store.update(&pid("mug"), qty(4)).unwrap();
        assert_eq!(cart.item_count(), 5);

        let cart = store.remove(&pid("tee")).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total(), Decimal::new(4000, 2));
    }

    #[test]
    fn test_update_and_remove_missing_line() {
        let store = store();
        assert!(matches!(
            store.update(&pid("tee"), qty(1)),
            Err(GuestCartError::NotInCart(_))
        ));
        assert!(matches!(
            store.remove(&pid("tee")),
            Err(GuestCartError::NotInCart(_))
        ));
    }

    #[test]
    fn test_clear() {
        let store = store();
        store.add(&pid("tee"), qty(1)).unwrap();
        store.clear();
        assert!(store.snapshot().is_empty());
    }
}
