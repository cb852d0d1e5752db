//! Cart route handlers.
//!
//! Every handler is a render: it syncs the shopper's engine with the auth
//! status from the session before reading or writing, so a login edge is
//! noticed, and an owed merge retried, on whatever request comes next.

use axum::{
    Json,
    extract::{Path, State},
};
use cartbridge_core::{CartSnapshot, ProductId, Quantity, ReconciliationState};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cart::{CartError, Diagnostics, ErrorKind};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::Shopper;
use crate::state::{AppState, ShopperEngine};

/// Cart as returned to the shopper.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    /// The unified cart.
    pub cart: CartSnapshot,
    /// Whether engine work is still in flight.
    pub loading: bool,
    /// Most recent failure, if any.
    pub last_error: Option<ErrorKind>,
    /// Reconciliation state, for diagnostics only.
    pub reconciliation: ReconciliationState,
}

impl CartResponse {
    fn new(engine: &ShopperEngine, cart: CartSnapshot) -> Self {
        Self {
            cart,
            loading: engine.is_loading(),
            last_error: engine.last_error(),
            reconciliation: engine.reconciliation_state(),
        }
    }
}

/// Add line request body.
#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub product_id: String,
    pub quantity: Option<i64>,
}

/// Update line request body.
#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: i64,
}

// =============================================================================
// Helpers
// =============================================================================

/// Find the shopper's engine and bring it up to date with their auth status.
async fn synced_engine(state: &AppState, shopper: &Shopper) -> std::sync::Arc<ShopperEngine> {
    let engine = state.carts().engine(shopper.id).await;
    let outcome = engine.sync(shopper.status.clone()).await;
    tracing::debug!(?outcome, "Engine synced");
    engine
}

fn parse_product_id(raw: &str) -> std::result::Result<ProductId, CartError> {
    Ok(ProductId::parse(raw)?)
}

fn parse_quantity(raw: i64) -> std::result::Result<Quantity, CartError> {
    Ok(Quantity::from_signed(raw)?)
}

/// Respond with the unified cart after a mutation.
async fn after_mutation(engine: &ShopperEngine) -> Json<CartResponse> {
    let cart = engine.unified_snapshot().await;
    Json(CartResponse::new(engine, cart))
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the unified cart.
#[instrument(skip(state, shopper), fields(shopper = %shopper.id))]
pub async fn show(State(state): State<AppState>, shopper: Shopper) -> Json<CartResponse> {
    let engine = synced_engine(&state, &shopper).await;
    let cart = engine.unified_snapshot().await;
    Json(CartResponse::new(&engine, cart))
}

/// Add units of a product.
#[instrument(skip(state, shopper), fields(shopper = %shopper.id))]
pub async fn add_line(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(body): Json<AddLineRequest>,
) -> Result<Json<CartResponse>> {
    let product_id = parse_product_id(&body.product_id)?;
    let quantity = parse_quantity(body.quantity.unwrap_or(1))?;

    let engine = synced_engine(&state, &shopper).await;
    engine.add(&product_id, quantity).await?;
    let data = [("product_id", product_id.as_str())];
    add_breadcrumb("cart", "Added line", Some(data.as_slice()));

    Ok(after_mutation(&engine).await)
}

/// Set the quantity of a line.
#[instrument(skip(state, shopper), fields(shopper = %shopper.id))]
pub async fn update_line(
    State(state): State<AppState>,
    shopper: Shopper,
    Path(product_id): Path<String>,
    Json(body): Json<UpdateLineRequest>,
) -> Result<Json<CartResponse>> {
    let product_id = parse_product_id(&product_id)?;
    let quantity = parse_quantity(body.quantity)?;

    let engine = synced_engine(&state, &shopper).await;
    engine.update(&product_id, quantity).await?;

    Ok(after_mutation(&engine).await)
}

/// Remove a line.
#[instrument(skip(state, shopper), fields(shopper = %shopper.id))]
pub async fn remove_line(
    State(state): State<AppState>,
    shopper: Shopper,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>> {
    let product_id = parse_product_id(&product_id)?;

    let engine = synced_engine(&state, &shopper).await;
    engine.remove(&product_id).await?;
    let data = [("product_id", product_id.as_str())];
    add_breadcrumb("cart", "Removed line", Some(data.as_slice()));

    Ok(after_mutation(&engine).await)
}

/// Remove every line.
#[instrument(skip(state, shopper), fields(shopper = %shopper.id))]
pub async fn clear(State(state): State<AppState>, shopper: Shopper) -> Result<Json<CartResponse>> {
    let engine = synced_engine(&state, &shopper).await;
    engine.clear().await?;
    add_breadcrumb("cart", "Cleared cart", None);

    Ok(after_mutation(&engine).await)
}

/// Reconciliation diagnostics.
#[instrument(skip(state, shopper), fields(shopper = %shopper.id))]
pub async fn status(State(state): State<AppState>, shopper: Shopper) -> Json<Diagnostics> {
    let engine = synced_engine(&state, &shopper).await;
    Json(engine.diagnostics())
}
