//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                   - Liveness check
//!
//! # Cart (JSON)
//! GET    /cart                     - Unified cart with loading and error flags
//! POST   /cart/lines               - Add a product {product_id, quantity?}
//! PUT    /cart/lines/{product_id}  - Set a line's quantity {quantity}
//! DELETE /cart/lines/{product_id}  - Remove a line
//! DELETE /cart                     - Remove every line
//! GET    /cart/status              - Reconciliation diagnostics
//!
//! # Customer session
//! POST   /session/customer         - Record a login {customer_id, access_token}
//! DELETE /session/customer         - Record a logout
//! ```

pub mod cart;
pub mod session;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/lines", post(cart::add_line))
        .route(
            "/lines/{product_id}",
            put(cart::update_line).delete(cart::remove_line),
        )
        .route("/status", get(cart::status))
}

/// Create the customer session routes router.
pub fn session_routes() -> Router<AppState> {
    Router::new().route(
        "/customer",
        post(session::sign_in).delete(session::sign_out),
    )
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/session", session_routes())
}
