//! Remote cart service commands.
//!
//! # Usage
//!
//! ```bash
//! # Show a customer's authenticated cart
//! cartbridge remote show --customer-id cust-1042 --token "$TOKEN"
//! ```
//!
//! # Environment Variables
//!
//! - `CART_SERVICE_URL` - Remote cart API base URL (overridden by `--url`)

use std::time::Duration;

use cartbridge_core::CartSnapshot;
use cartbridge_storefront::auth::Principal;
use cartbridge_storefront::config::CartServiceConfig;
use cartbridge_storefront::stores::{AuthenticatedCartService, HttpCartService, RemoteError};
use url::Url;

/// Request timeout for one-off inspection calls.
const TIMEOUT: Duration = Duration::from_secs(10);

/// Fetch a customer's authenticated cart.
///
/// # Returns
///
/// The cart, or `None` if the service has no cart for the customer yet.
///
/// # Errors
///
/// Returns an error if the service cannot be reached or rejects the token.
pub async fn show(
    url: Url,
    customer_id: &str,
    token: &str,
) -> Result<Option<CartSnapshot>, RemoteError> {
    let service = HttpCartService::new(&CartServiceConfig {
        url,
        timeout: TIMEOUT,
    })?;

    tracing::info!("Fetching cart for {}", customer_id);
    service.snapshot(&Principal::new(customer_id, token)).await
}
