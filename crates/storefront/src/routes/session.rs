//! Customer session handlers.
//!
//! Authentication happens at the auth provider. Once it has issued a
//! customer access token, the host records it here; from then on the
//! shopper's requests carry an authenticated status. The token is checked
//! against the cart service first, so a refused token never reaches the
//! session. Signing out forgets the token but keeps the shopper, so the next
//! login merges whatever the guest cart holds by then.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use crate::auth::{AuthStatus, Principal};
use crate::cart::Diagnostics;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{Shopper, clear_current_customer, set_current_customer};
use crate::models::CurrentCustomer;
use crate::state::AppState;
use crate::stores::{AuthenticatedCartService, RemoteError};

/// Sign-in request body.
#[derive(Deserialize)]
pub struct SignInRequest {
    pub customer_id: String,
    pub access_token: String,
}

/// Record the customer and start their login session.
#[instrument(skip(state, shopper, body), fields(shopper = %shopper.id))]
pub async fn sign_in(
    State(state): State<AppState>,
    shopper: Shopper,
    Json(body): Json<SignInRequest>,
) -> Result<Json<Diagnostics>> {
    let customer_id = body.customer_id.trim();
    if customer_id.is_empty() {
        return Err(AppError::BadRequest("customer_id is required".to_string()));
    }
    if body.access_token.trim().is_empty() {
        return Err(AppError::BadRequest("access_token is required".to_string()));
    }

    let customer = CurrentCustomer {
        customer_id: customer_id.to_string(),
        access_token: body.access_token,
    };
    verify_credentials(&state, &customer.principal()).await?;

    set_current_customer(shopper.session(), &customer).await?;
    set_sentry_user(customer_id);
    add_breadcrumb("auth", "Customer signed in", None);
    tracing::info!(customer = %customer_id, "Customer signed in");

    let engine = state.carts().engine(shopper.id).await;
    let outcome = engine
        .sync(AuthStatus::Authenticated(customer.principal()))
        .await;
    tracing::debug!(?outcome, "Engine synced after sign-in");

    Ok(Json(engine.diagnostics()))
}

/// Ask the cart service whether it accepts `principal`'s token.
///
/// Only an explicit 401 or 403 refuses the sign-in; other failures are
/// left for the engine to retry.
async fn verify_credentials(state: &AppState, principal: &Principal) -> Result<()> {
    match state.carts().remote().snapshot(principal).await {
        Err(RemoteError::Status {
            status: 401 | 403, ..
        }) => {
            tracing::warn!(customer = %principal.customer_id(), "Cart service refused credentials");
            Err(AppError::Unauthorized(
                "access token was not accepted".to_string(),
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not verify credentials, continuing");
            Ok(())
        }
        Ok(_) => Ok(()),
    }
}

/// Forget the customer and reset reconciliation.
#[instrument(skip(state, shopper), fields(shopper = %shopper.id))]
pub async fn sign_out(State(state): State<AppState>, shopper: Shopper) -> Result<Json<Diagnostics>> {
    clear_current_customer(shopper.session()).await?;
    clear_sentry_user();
    add_breadcrumb("auth", "Customer signed out", None);
    tracing::info!("Customer signed out");

    let engine = state.carts().engine(shopper.id).await;
    engine.sync(AuthStatus::Guest).await;

    Ok(Json(engine.diagnostics()))
}
