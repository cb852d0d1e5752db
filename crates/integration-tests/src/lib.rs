//! Integration tests for Cartbridge.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartbridge-integration-tests
//! ```
//!
//! Everything runs in-process: the storefront router is driven with
//! `tower::ServiceExt::oneshot` and the authenticated cart lives in a
//! [`MemoryCartService`], so no servers or credentials are needed.
//!
//! # Test Categories
//!
//! - `cart_reconciliation` - Engine behaviour across the public API
//! - `storefront_cart_api` - The JSON cart API, session cookie included

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use cartbridge_core::{CurrencyCode, Price, ProductId};
use cartbridge_storefront::cart::EngineConfig;
use cartbridge_storefront::catalog::{Catalog, CatalogProduct, StaticCatalog};
use cartbridge_storefront::config::{SentryConfig, StorefrontConfig};
use cartbridge_storefront::state::AppState;
use cartbridge_storefront::stores::{MemoryCartService, RemoteCart};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

/// Catalog used by every test: a $20.00 tee and a $12.50 mug.
///
/// # Panics
///
/// Never; the fixture products are valid.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn catalog() -> Arc<dyn Catalog> {
    let product = |id: &str, name: &str, cents| CatalogProduct {
        id: ProductId::parse(id).unwrap(),
        name: name.to_string(),
        image: None,
        sku: Some(id.to_uppercase()),
        price: Price::new(Decimal::new(cents, 2), CurrencyCode::USD),
    };

    Arc::new(
        StaticCatalog::from_products(vec![
            product("tee", "Tee", 2000),
            product("mug", "Mug", 1250),
        ])
        .unwrap(),
    )
}

/// Storefront configuration for in-process tests.
#[must_use]
pub fn test_config(settle_delay: Duration) -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        catalog_path: "catalog.json".into(),
        cart_service: None,
        engine: EngineConfig { settle_delay },
        session_idle: Duration::from_secs(3600),
        sentry: SentryConfig {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        },
    }
}

/// A storefront router plus the cookie jar of one browser.
pub struct TestApp {
    router: Router,
    remote: MemoryCartService,
    cookie: Option<String>,
}

impl TestApp {
    /// Build the app over a fresh in-process cart service.
    #[must_use]
    pub fn new(settle_delay: Duration) -> Self {
        let catalog = catalog();
        let remote = MemoryCartService::new(Arc::clone(&catalog));
        let state = AppState::new(
            test_config(settle_delay),
            catalog,
            RemoteCart::Memory(remote.clone()),
        );

        Self {
            router: cartbridge_storefront::app(state),
            remote,
            cookie: None,
        }
    }

    /// The authenticated cart service behind the app.
    #[must_use]
    pub const fn remote(&self) -> &MemoryCartService {
        &self.remote
    }

    /// A second browser against the same server; starts without a cookie.
    #[must_use]
    pub fn new_browser(&self) -> Self {
        Self {
            router: self.router.clone(),
            remote: self.remote.clone(),
            cookie: None,
        }
    }

    /// Send a request, carrying and updating the session cookie.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    #[allow(clippy::unwrap_used)]
    pub async fn request(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    /// `GET` shorthand.
    pub async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    /// `POST` shorthand.
    pub async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }
}
