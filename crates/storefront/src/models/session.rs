//! Session-related types.
//!
//! The session only identifies the shopper. Cart contents live in the
//! shopper's engine, never in the cookie-backed session record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::Principal;

/// Customer login recorded by the auth provider.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Stable customer identifier.
    pub customer_id: String,
    /// Bearer token for the authenticated cart service.
    pub access_token: String,
}

impl CurrentCustomer {
    /// The cart principal for this customer.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal::new(self.customer_id.clone(), self.access_token.clone())
    }
}

impl fmt::Debug for CurrentCustomer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentCustomer")
            .field("customer_id", &self.customer_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// Key for the shopper's engine ID.
    pub const SHOPPER_ID: &str = "shopper_id";

    /// Key for the logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_customer_debug_redacts_token() {
        let customer = CurrentCustomer {
            customer_id: "cust-1".to_string(),
            access_token: "super_secret_token".to_string(),
        };
        let debug_output = format!("{customer:?}");
        assert!(debug_output.contains("cust-1"));
        assert!(!debug_output.contains("super_secret_token"));
    }

    #[test]
    fn test_principal_carries_token() {
        let customer = CurrentCustomer {
            customer_id: "cust-1".to_string(),
            access_token: "tok".to_string(),
        };
        let principal = customer.principal();
        assert_eq!(principal.customer_id(), "cust-1");
        assert_eq!(principal.access_token(), "tok");
    }
}
