//! Cartbridge Storefront library.
//!
//! This crate owns the cart reconciliation engine: a shopper's guest cart
//! lives in the storefront's memory until they log in, at which point it is
//! merged exactly once into their authenticated cart at the remote cart
//! service. Until that merge is confirmed, reads show the guest cart, so
//! items never vanish during the hand-off.
//!
//! # Modules
//!
//! - [`auth`] - Auth status and the signal the engine watches
//! - [`cart`] - Reconciliation engine, mutation routing and the unified view
//! - [`catalog`] - Product data for guest carts
//! - [`stores`] - Guest cart store and authenticated cart service adapters
//! - [`routes`] / [`middleware`] - JSON cart API over axum

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod stores;

use axum::{Router, middleware as axum_middleware, routing::get};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the storefront router with its middleware stack.
///
/// Sentry layers are added by the binary, outside this router.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(session_layer)
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
