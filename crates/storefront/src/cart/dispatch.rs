//! Mutation routing.
//!
//! Writes go where the shopper's auth status says, not where the visible
//! lines currently live: once authenticated, every write targets the
//! authenticated cart even while the view still shows guest lines.

use cartbridge_core::{CartSnapshot, ProductId, Quantity};

use super::CartError;
use crate::auth::{AuthStatus, Principal};
use crate::stores::{AuthenticatedCartService, GuestCartStore};

/// Store a mutation is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The guest cart.
    Guest,
    /// The authenticated cart of this principal.
    Remote(Principal),
}

impl Route {
    /// Route for the given auth status. An undetermined status is treated
    /// as anonymous.
    ///
    /// This holds even inside a settled login session: a write made while
    /// auth is `Unknown` lands in the guest cart, which a settled session
    /// does not show. It reappears after logout and is merged on the next
    /// login.
    #[must_use]
    pub fn for_status(status: &AuthStatus) -> Self {
        match status {
            AuthStatus::Authenticated(principal) => Self::Remote(principal.clone()),
            AuthStatus::Guest | AuthStatus::Unknown => Self::Guest,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Remote(_) => "authenticated",
        }
    }
}

/// A cart mutation requested by the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Add units of a product.
    Add {
        product_id: ProductId,
        quantity: Quantity,
    },
    /// Set a line's quantity.
    Update {
        product_id: ProductId,
        quantity: Quantity,
    },
    /// Remove a line.
    Remove { product_id: ProductId },
    /// Remove every line.
    Clear,
}

impl CartMutation {
    /// Operation name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Remove { .. } => "remove",
            Self::Clear => "clear",
        }
    }
}

/// Apply `mutation` to the store selected by `route`.
///
/// # Errors
///
/// Guest failures map to `InvalidOperand`; any authenticated service failure
/// maps to `RemoteUnavailable`. Either way the targeted cart is unchanged.
pub async fn apply<G, A>(
    route: &Route,
    mutation: &CartMutation,
    guest: &G,
    remote: &A,
) -> Result<CartSnapshot, CartError>
where
    G: GuestCartStore + ?Sized,
    A: AuthenticatedCartService,
{
    match route {
        Route::Guest => apply_guest(mutation, guest),
        Route::Remote(principal) => {
            let snapshot = match mutation {
                CartMutation::Add {
                    product_id,
                    quantity,
                } => remote.add(principal, product_id, *quantity).await?,
                CartMutation::Update {
                    product_id,
                    quantity,
                } => remote.update(principal, product_id, *quantity).await?,
                CartMutation::Remove { product_id } => {
                    remote.remove(principal, product_id).await?
                }
                CartMutation::Clear => {
                    remote.clear(principal).await?;
                    CartSnapshot::empty()
                }
            };
            Ok(snapshot)
        }
    }
}

fn apply_guest<G>(mutation: &CartMutation, guest: &G) -> Result<CartSnapshot, CartError>
where
    G: GuestCartStore + ?Sized,
{
    let snapshot = match mutation {
        CartMutation::Add {
            product_id,
            quantity,
        } => guest.add(product_id, *quantity)?,
        CartMutation::Update {
            product_id,
            quantity,
        } => guest.update(product_id, *quantity)?,
        CartMutation::Remove { product_id } => guest.remove(product_id)?,
        CartMutation::Clear => {
            guest.clear();
            CartSnapshot::empty()
        }
    };
    Ok(snapshot)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use cartbridge_core::{CurrencyCode, Price};
    use rust_decimal::Decimal;

    use super::*;
    use crate::cart::ErrorKind;
    use crate::catalog::{CatalogProduct, StaticCatalog};
    use crate::stores::{MemoryCartService, MemoryGuestStore};

    fn pid(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    fn stores() -> (MemoryGuestStore, MemoryCartService) {
        let catalog: Arc<StaticCatalog> = Arc::new(
            StaticCatalog::from_products(vec![CatalogProduct {
                id: pid("tee"),
                name: "Tee".to_string(),
                image: None,
                sku: None,
                price: Price::new(Decimal::new(2000, 2), CurrencyCode::USD),
            }])
            .unwrap(),
        );
        (
            MemoryGuestStore::new(catalog.clone()),
            MemoryCartService::new(catalog),
        )
    }

    fn add(product: &str) -> CartMutation {
        CartMutation::Add {
            product_id: pid(product),
            quantity: Quantity::ONE,
        }
    }

    #[test]
    fn test_route_for_status() {
        let principal = Principal::new("c1", "t");
        assert_eq!(Route::for_status(&AuthStatus::Unknown), Route::Guest);
        assert_eq!(Route::for_status(&AuthStatus::Guest), Route::Guest);
        assert_eq!(
            Route::for_status(&AuthStatus::Authenticated(principal.clone())),
            Route::Remote(principal)
        );
    }

    #[tokio::test]
    async fn test_guest_route_touches_only_guest() {
        let (guest, remote) = stores();
        apply(&Route::Guest, &add("tee"), &guest, &remote)
            .await
            .unwrap();

        assert_eq!(guest.snapshot().item_count(), 1);
        assert!(remote.cart_of("c1").is_none());
    }

    #[tokio::test]
    async fn test_remote_route_touches_only_remote() {
        let (guest, remote) = stores();
        let route = Route::Remote(Principal::new("c1", "t"));
        let cart = apply(&route, &add("tee"), &guest, &remote).await.unwrap();

        assert_eq!(cart.item_count(), 1);
        assert!(guest.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let (guest, remote) = stores();

        let err = apply(&Route::Guest, &add("hat"), &guest, &remote)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperand);

        remote.fail_next_calls(1);
        let route = Route::Remote(Principal::new("c1", "t"));
        let err = apply(&route, &add("tee"), &guest, &remote)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
        assert!(remote.cart_of("c1").is_none());
    }

    #[tokio::test]
    async fn test_clear_returns_empty_snapshot() {
        let (guest, remote) = stores();
        apply(&Route::Guest, &add("tee"), &guest, &remote)
            .await
            .unwrap();
        let cart = apply(&Route::Guest, &CartMutation::Clear, &guest, &remote)
            .await
            .unwrap();
        assert!(cart.is_empty());
        assert!(guest.snapshot().is_empty());
    }
}
