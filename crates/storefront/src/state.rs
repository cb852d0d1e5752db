//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use crate::cart::{CartEngine, EngineConfig};
use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::stores::{MemoryGuestStore, RemoteCart};

/// Engine serving one shopper.
pub type ShopperEngine = CartEngine<MemoryGuestStore, RemoteCart>;

/// Upper bound on concurrently tracked shoppers.
const MAX_SHOPPERS: u64 = 100_000;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    carts: ShopperCarts,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `catalog` - Product catalog used by guest carts
    /// * `remote` - Authenticated cart service shared by every shopper
    #[must_use]
    pub fn new(config: StorefrontConfig, catalog: Arc<dyn Catalog>, remote: RemoteCart) -> Self {
        let carts = ShopperCarts::new(catalog, remote, config.engine, config.session_idle);
        Self {
            inner: Arc::new(AppStateInner { config, carts }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the per-shopper engine registry.
    #[must_use]
    pub fn carts(&self) -> &ShopperCarts {
        &self.inner.carts
    }
}

/// Per-shopper engines, keyed by the shopper ID stored in their session.
///
/// Engines are evicted after the same inactivity window as the session, so a
/// guest cart lives exactly as long as the session that can reach it.
#[derive(Clone)]
pub struct ShopperCarts {
    inner: Arc<ShopperCartsInner>,
}

struct ShopperCartsInner {
    engines: Cache<Uuid, Arc<ShopperEngine>>,
    catalog: Arc<dyn Catalog>,
    remote: RemoteCart,
    engine_config: EngineConfig,
}

impl ShopperCarts {
    /// Create an empty registry.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        remote: RemoteCart,
        engine_config: EngineConfig,
        idle: Duration,
    ) -> Self {
        let engines = Cache::builder()
            .max_capacity(MAX_SHOPPERS)
            .time_to_idle(idle)
            .build();

        Self {
            inner: Arc::new(ShopperCartsInner {
                engines,
                catalog,
                remote,
                engine_config,
            }),
        }
    }

    /// The engine for `shopper`, created on first use.
    pub async fn engine(&self, shopper: Uuid) -> Arc<ShopperEngine> {
        let catalog = Arc::clone(&self.inner.catalog);
        let remote = self.inner.remote.clone();
        let config = self.inner.engine_config;

        self.inner
            .engines
            .get_with(shopper, async move {
                tracing::debug!(%shopper, "Creating cart engine");
                Arc::new(CartEngine::new(
                    MemoryGuestStore::new(catalog),
                    remote,
                    config,
                ))
            })
            .await
    }

    /// The shared authenticated cart service.
    #[must_use]
    pub fn remote(&self) -> &RemoteCart {
        &self.inner.remote
    }

    /// Number of live engines. Approximate until pending cache tasks run.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.inner.engines.entry_count()
    }

    /// Whether no engines are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::stores::MemoryCartService;

    fn carts() -> ShopperCarts {
        let catalog: Arc<dyn Catalog> = Arc::new(StaticCatalog::default());
        let remote = RemoteCart::Memory(MemoryCartService::new(Arc::clone(&catalog)));
        ShopperCarts::new(catalog, remote, EngineConfig::default(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_same_shopper_same_engine() {
        let carts = carts();
        let shopper = Uuid::new_v4();

        let first = carts.engine(shopper).await;
        let second = carts.engine(shopper).await;
        assert!(Arc::ptr_eq(&first, &second));

        let other = carts.engine(Uuid::new_v4()).await;
        assert!(!Arc::ptr_eq(&first, &other));
    }
}
