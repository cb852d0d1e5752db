//! In-process authenticated cart service.
//!
//! Used when no remote cart API is configured, and by tests. Carts are keyed
//! by customer ID. The service applies the merge conflict rule itself and
//! remembers applied merge keys, so retried merges are not double counted.
//!
//! The first access token presented for a customer is bound to that
//! customer; later calls with a different token are rejected with 401.
//!
//! It can also misbehave on request: fail a number of calls, or serve stale
//! reads for a while after a merge to mimic read-after-write lag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cartbridge_core::{CartItem, CartSnapshot, MergeLine, ProductId, Quantity, QuantityError};
use moka::sync::Cache;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use super::{AuthenticatedCartService, MergeKey, RemoteError};
use crate::auth::Principal;
use crate::cart::merge::merge_into;
use crate::catalog::Catalog;

/// How long an applied merge key is remembered.
const MERGE_KEY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on remembered merge keys.
const MAX_MERGE_KEYS: u64 = 100_000;

/// In-process cart service.
#[derive(Clone)]
pub struct MemoryCartService {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    catalog: Arc<dyn Catalog>,
    state: Mutex<MemoryState>,
    merge_calls: AtomicUsize,
}

struct MemoryState {
    carts: HashMap<String, CartSnapshot>,
    tokens: HashMap<String, SecretString>,
    applied_merges: Cache<MergeKey, ()>,
    /// Pre-merge carts still being served, with the number of reads left.
    lagging: HashMap<String, (Option<CartSnapshot>, u32)>,
    fail_merges: u32,
    fail_calls: u32,
    lag_reads: u32,
}

impl MemoryCartService {
    /// Create an empty service backed by `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                catalog,
                state: Mutex::new(MemoryState {
                    carts: HashMap::new(),
                    tokens: HashMap::new(),
                    applied_merges: Cache::builder()
                        .max_capacity(MAX_MERGE_KEYS)
                        .time_to_live(MERGE_KEY_TTL)
                        .build(),
                    lagging: HashMap::new(),
                    fail_merges: 0,
                    fail_calls: 0,
                    lag_reads: 0,
                }),
                merge_calls: AtomicUsize::new(0),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace a customer's cart.
    pub fn seed(&self, customer_id: &str, cart: CartSnapshot) {
        self.state().carts.insert(customer_id.to_string(), cart);
    }

    /// Current cart of a customer, bypassing any simulated lag.
    #[must_use]
    pub fn cart_of(&self, customer_id: &str) -> Option<CartSnapshot> {
        self.state().carts.get(customer_id).cloned()
    }

    /// Number of `merge_in` invocations so far, failed ones included.
    #[must_use]
    pub fn merge_calls(&self) -> usize {
        self.inner.merge_calls.load(Ordering::SeqCst)
    }

    /// Make the next `n` merges fail.
    pub fn fail_next_merges(&self, n: u32) {
        self.state().fail_merges = n;
    }

    /// Make the next `n` non-merge calls fail.
    pub fn fail_next_calls(&self, n: u32) {
        self.state().fail_calls = n;
    }

    /// After each merge, serve the pre-merge cart for the next `n` reads.
    pub fn lag_reads_after_merge(&self, n: u32) {
        self.state().lag_reads = n;
    }

    /// Check `principal`'s token against the one bound to the customer,
    /// binding it if this is the customer's first call.
    fn authorize(state: &mut MemoryState, principal: &Principal) -> Result<(), RemoteError> {
        let bound = state
            .tokens
            .entry(principal.customer_id().to_string())
            .or_insert_with(|| SecretString::from(principal.access_token().to_string()));
        if bound.expose_secret() != principal.access_token() {
            warn!(customer = %principal.customer_id(), "Rejected access token");
            return Err(RemoteError::Status {
                status: 401,
                message: "access token does not match customer".to_string(),
            });
        }
        Ok(())
    }

    fn take_call_failure(state: &mut MemoryState) -> Result<(), RemoteError> {
        if state.fail_calls > 0 {
            state.fail_calls -= 1;
            return Err(RemoteError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn unknown_product(product_id: &ProductId) -> RemoteError {
        RemoteError::Status {
            status: 422,
            message: format!("unknown product: {product_id}"),
        }
    }

    fn too_large(err: &QuantityError) -> RemoteError {
        RemoteError::Status {
            status: 422,
            message: err.to_string(),
        }
    }

    fn missing_line(product_id: &ProductId) -> RemoteError {
        RemoteError::Status {
            status: 404,
            message: format!("product {product_id} is not in the cart"),
        }
    }

    /// Build a fresh line for `product_id` from the catalog.
    fn catalog_line(&self, product_id: &ProductId, quantity: Quantity) -> Option<CartItem> {
        let product = self.inner.catalog.product(product_id)?;
        Some(CartItem::new(
            product_id.clone(),
            quantity,
            product.price,
            product.snapshot(),
        ))
    }

    /// Apply `edit` to the customer's lines and store the result.
    fn mutate(
        &self,
        principal: &Principal,
        edit: impl FnOnce(&mut Vec<CartItem>) -> Result<(), RemoteError>,
    ) -> Result<CartSnapshot, RemoteError> {
        let mut state = self.state();
        Self::authorize(&mut state, principal)?;
        Self::take_call_failure(&mut state)?;

        let current = state.carts.get(principal.customer_id());
        let (mut items, tax, shipping) = current.map_or_else(
            || (Vec::new(), Decimal::ZERO, Decimal::ZERO),
            |cart| (cart.items().to_vec(), cart.tax(), cart.shipping()),
        );
        edit(&mut items)?;

        let next = CartSnapshot::from_items(items, tax, shipping).map_err(|e| {
            RemoteError::Status {
                status: 422,
                message: e.to_string(),
            }
        })?;
        state
            .carts
            .insert(principal.customer_id().to_string(), next.clone());
        Ok(next)
    }
}

impl AuthenticatedCartService for MemoryCartService {
    async fn snapshot(&self, principal: &Principal) -> Result<Option<CartSnapshot>, RemoteError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        Self::authorize(&mut state, principal)?;
        Self::take_call_failure(&mut state)?;

        if let Some((stale, remaining)) = state.lagging.remove(principal.customer_id()) {
            debug!(customer = %principal.customer_id(), "Serving pre-merge cart");
            if remaining > 1 {
                state
                    .lagging
                    .insert(principal.customer_id().to_string(), (stale.clone(), remaining - 1));
            }
            return Ok(stale);
        }

        Ok(state.carts.get(principal.customer_id()).cloned())
    }

    async fn add(
        &self,
        principal: &Principal,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, RemoteError> {
        tokio::task::yield_now().await;
        self.mutate(principal, |items| {
            if let Some(line) = items.iter_mut().find(|i| &i.product_id == product_id) {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .map_err(|e| Self::too_large(&e))?;
                return Ok(());
            }
            let line = self
                .catalog_line(product_id, quantity)
                .ok_or_else(|| Self::unknown_product(product_id))?;
            items.push(line);
            Ok(())
        })
    }

    async fn update(
        &self,
        principal: &Principal,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, RemoteError> {
        tokio::task::yield_now().await;
        self.mutate(principal, |items| {
            let line = items
                .iter_mut()
                .find(|i| &i.product_id == product_id)
                .ok_or_else(|| Self::missing_line(product_id))?;
            line.quantity = quantity;
            Ok(())
        })
    }

    async fn remove(
        &self,
        principal: &Principal,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, RemoteError> {
        tokio::task::yield_now().await;
        self.mutate(principal, |items| {
            let before = items.len();
            items.retain(|i| &i.product_id != product_id);
            if items.len() == before {
                return Err(Self::missing_line(product_id));
            }
            Ok(())
        })
    }

    async fn clear(&self, principal: &Principal) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        Self::authorize(&mut state, principal)?;
        Self::take_call_failure(&mut state)?;
        state.carts.remove(principal.customer_id());
        Ok(())
    }

    async fn merge_in(
        &self,
        principal: &Principal,
        key: MergeKey,
        lines: &[MergeLine],
    ) -> Result<(), RemoteError> {
        self.inner.merge_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let incoming: Vec<CartItem> = lines
            .iter()
            .filter_map(|line| {
                let item = self.catalog_line(&line.product_id, line.quantity);
                if item.is_none() {
                    warn!(product = %line.product_id, "Dropping unknown product from merge");
                }
                item
            })
            .collect();

        let mut state = self.state();
        Self::authorize(&mut state, principal)?;
        if state.fail_merges > 0 {
            state.fail_merges -= 1;
            return Err(RemoteError::Unavailable("injected merge failure".to_string()));
        }

        if state.applied_merges.contains_key(&key) {
            debug!(%key, "Merge already applied");
            return Ok(());
        }

        let customer = principal.customer_id().to_string();
        let previous = state.carts.get(&customer).cloned();
        let (existing, tax, shipping) = previous.as_ref().map_or_else(
            || (Vec::new(), Decimal::ZERO, Decimal::ZERO),
            |cart| (cart.items().to_vec(), cart.tax(), cart.shipping()),
        );

        let items = merge_into(&existing, &incoming).map_err(|e| {
            warn!(customer = %customer, %key, error = %e, "Rejected merge over line maximum");
            Self::too_large(&e)
        })?;
        let merged =
            CartSnapshot::from_items(items, tax, shipping).map_err(|e| RemoteError::Status {
                status: 422,
                message: e.to_string(),
            })?;

        if state.lag_reads > 0 {
            let lag = state.lag_reads;
            state.lagging.insert(customer.clone(), (previous, lag));
        }
        state.carts.insert(customer, merged);
        state.applied_merges.insert(key, ());
        Ok(())
    }
}
