//! Authenticated (server-side) cart service.
//!
//! # Adapters
//!
//! - [`HttpCartService`] - JSON client for the remote cart API
//! - [`MemoryCartService`] - in-process service for local development and tests
//! - [`RemoteCart`] - picks one of the above at startup from configuration
//!
//! Every operation is asynchronous and may fail; the engine treats any
//! [`RemoteError`] as "remote unavailable".

mod http;
mod memory;

pub use http::HttpCartService;
pub use memory::MemoryCartService;

use std::fmt;
use std::future::Future;

use cartbridge_core::{CartSnapshot, MergeLine, ProductId, Quantity};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Principal;

/// Errors that can occur when talking to the authenticated cart service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The service answered with a non-success status.
    #[error("cart service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The service is unreachable or refused the call.
    #[error("cart service unavailable: {0}")]
    Unavailable(String),
}

/// Idempotency key for one login session's merge.
///
/// Created when a merge becomes owed and reused for every retry of that
/// merge, so a service that already applied it can recognise the repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeKey(Uuid);

impl MergeKey {
    /// Generate a fresh key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MergeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The server-persisted cart of a logged-in principal.
pub trait AuthenticatedCartService: Send + Sync {
    /// Fetch the principal's cart. `None` means the service has no cart yet.
    fn snapshot(
        &self,
        principal: &Principal,
    ) -> impl Future<Output = Result<Option<CartSnapshot>, RemoteError>> + Send;

    /// Add units of a product.
    fn add(
        &self,
        principal: &Principal,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<CartSnapshot, RemoteError>> + Send;

    /// Set the quantity of a line.
    fn update(
        &self,
        principal: &Principal,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<CartSnapshot, RemoteError>> + Send;

    /// Remove a line.
    fn remove(
        &self,
        principal: &Principal,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<CartSnapshot, RemoteError>> + Send;

    /// Remove every line.
    fn clear(&self, principal: &Principal) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Fold guest lines into the principal's cart.
    ///
    /// Must be safe to retry with the same `key`: a repeat of an already
    /// applied merge must not count the lines twice.
    fn merge_in(
        &self,
        principal: &Principal,
        key: MergeKey,
        lines: &[MergeLine],
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Authenticated cart service selected at startup.
#[derive(Clone)]
pub enum RemoteCart {
    /// Remote cart API over HTTP.
    Http(HttpCartService),
    /// In-process cart service.
    Memory(MemoryCartService),
}

impl AuthenticatedCartService for RemoteCart {
    async fn snapshot(&self, principal: &Principal) -> Result<Option<CartSnapshot>, RemoteError> {
        match self {
            Self::Http(service) => service.snapshot(principal).await,
            Self::Memory(service) => service.snapshot(principal).await,
        }
    }

    async fn add(
        &self,
        principal: &Principal,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, RemoteError> {
        match self {
            Self::Http(service) => service.add(principal, product_id, quantity).await,
            Self::Memory(service) => service.add(principal, product_id, quantity).await,
        }
    }

    async fn update(
        &self,
        principal: &Principal,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, RemoteError> {
        match self {
            Self::Http(service) => service.update(principal, product_id, quantity).await,
            Self::Memory(service) => service.update(principal, product_id, quantity).await,
        }
    }

    async fn remove(
        &self,
        principal: &Principal,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, RemoteError> {
        match self {
            Self::Http(service) => service.remove(principal, product_id).await,
            Self::Memory(service) => service.remove(principal, product_id).await,
        }
    }

    async fn clear(&self, principal: &Principal) -> Result<(), RemoteError> {
        match self {
            Self::Http(service) => service.clear(principal).await,
            Self::Memory(service) => service.clear(principal).await,
        }
    }

    async fn merge_in(
        &self,
        principal: &Principal,
        key: MergeKey,
        lines: &[MergeLine],
    ) -> Result<(), RemoteError> {
        match self {
            Self::Http(service) => service.merge_in(principal, key, lines).await,
            Self::Memory(service) => service.merge_in(principal, key, lines).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::RateLimited(3);
        assert_eq!(err.to_string(), "Rate limited, retry after 3 seconds");

        let err = RemoteError::Status {
            status: 503,
            message: "down".to_string(),
        };
        assert_eq!(err.to_string(), "cart service returned 503: down");
    }

    #[test]
    fn test_merge_keys_are_unique() {
        assert_ne!(MergeKey::generate(), MergeKey::generate());
    }
}
