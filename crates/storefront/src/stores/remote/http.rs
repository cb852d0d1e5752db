//! Remote cart API client.
//!
//! Plain JSON over `reqwest` 0.13. The customer's access token is sent as a
//! bearer token on every call; merges carry an `Idempotency-Key` header.

use std::sync::Arc;
use std::time::Duration;

use cartbridge_core::{CartSnapshot, MergeLine, ProductId, Quantity};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::{AuthenticatedCartService, MergeKey, RemoteError};
use crate::auth::Principal;
use crate::config::CartServiceConfig;

/// Maximum number of response body characters kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Serialize)]
struct AddLineBody<'a> {
    product_id: &'a ProductId,
    quantity: Quantity,
}

#[derive(Serialize)]
struct UpdateLineBody {
    quantity: Quantity,
}

#[derive(Serialize)]
struct MergeBody<'a> {
    lines: &'a [MergeLine],
}

/// Client for the remote cart API.
#[derive(Clone)]
pub struct HttpCartService {
    inner: Arc<HttpCartServiceInner>,
}

struct HttpCartServiceInner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCartService {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &CartServiceConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpCartServiceInner {
                client,
                base_url: base_url(&config.url),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn line_endpoint(&self, product_id: &ProductId) -> String {
        self.endpoint(&line_path(product_id))
    }

    /// Send a request and map non-success statuses to errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await?;
        Self::check(response).await
    }

    /// Map a non-success response to an error.
    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(RemoteError::RateLimited(retry_after));
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            status = %status,
            body = %truncate(&body, 500),
            "Cart service returned non-success status"
        );
        Err(RemoteError::Status {
            status: status.as_u16(),
            message: truncate(&body, ERROR_BODY_LIMIT),
        })
    }

    /// Read a cart snapshot from a successful response.
    async fn read_snapshot(response: Response) -> Result<CartSnapshot, RemoteError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&text, 500),
                "Failed to parse cart service response"
            );
            RemoteError::Parse(e)
        })
    }
}

impl AuthenticatedCartService for HttpCartService {
    #[instrument(skip(self, principal), fields(customer = %principal.customer_id()))]
    async fn snapshot(&self, principal: &Principal) -> Result<Option<CartSnapshot>, RemoteError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("cart"))
            .bearer_auth(principal.access_token())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("No authenticated cart yet");
            return Ok(None);
        }

        let response = Self::check(response).await?;
        Self::read_snapshot(response).await.map(Some)
    }

    #[instrument(skip(self, principal), fields(customer = %principal.customer_id()))]
    async fn add(
        &self,
        principal: &Principal,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, RemoteError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("cart/lines"))
            .bearer_auth(principal.access_token())
            .json(&AddLineBody {
                product_id,
                quantity,
            });
        Self::read_snapshot(self.send(request).await?).await
    }

    #[instrument(skip(self, principal), fields(customer = %principal.customer_id()))]
    async fn update(
        &self,
        principal: &Principal,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, RemoteError> {
        let request = self
            .inner
            .client
            .put(self.line_endpoint(product_id))
            .bearer_auth(principal.access_token())
            .json(&UpdateLineBody { quantity });
        Self::read_snapshot(self.send(request).await?).await
    }

    #[instrument(skip(self, principal), fields(customer = %principal.customer_id()))]
    async fn remove(
        &self,
        principal: &Principal,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, RemoteError> {
        let request = self
            .inner
            .client
            .delete(self.line_endpoint(product_id))
            .bearer_auth(principal.access_token());
        Self::read_snapshot(self.send(request).await?).await
    }

    #[instrument(skip(self, principal), fields(customer = %principal.customer_id()))]
    async fn clear(&self, principal: &Principal) -> Result<(), RemoteError> {
        let request = self
            .inner
            .client
            .delete(self.endpoint("cart"))
            .bearer_auth(principal.access_token());
        self.send(request).await?;
        Ok(())
    }

    #[instrument(
        skip(self, principal, lines),
        fields(customer = %principal.customer_id(), lines = lines.len())
    )]
    async fn merge_in(
        &self,
        principal: &Principal,
        key: MergeKey,
        lines: &[MergeLine],
    ) -> Result<(), RemoteError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("cart/merge"))
            .bearer_auth(principal.access_token())
            .header("Idempotency-Key", key.to_string())
            .json(&MergeBody { lines });
        self.send(request).await?;
        Ok(())
    }
}

/// Normalize the configured base URL so relative paths can be appended.
fn base_url(url: &Url) -> String {
    let mut base = url.as_str().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Path of a single line, with the product ID percent-encoded.
fn line_path(product_id: &ProductId) -> String {
    format!("cart/lines/{}", urlencoding::encode(product_id.as_str()))
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = Url::parse("https://carts.example.com/api/v1").unwrap();
        assert_eq!(base_url(&url), "https://carts.example.com/api/v1/");

        let url = Url::parse("https://carts.example.com/").unwrap();
        assert_eq!(base_url(&url), "https://carts.example.com/");
    }

    #[test]
    fn test_line_path_encodes_product_id() {
        let id = ProductId::parse("gid://shop/Product/1").unwrap();
        assert_eq!(
            line_path(&id),
            "cart/lines/gid%3A%2F%2Fshop%2FProduct%2F1"
        );
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("ééééé", 3), "ééé");
        assert_eq!(truncate("ab", 10), "ab");
    }

    #[test]
    fn test_merge_body_shape() {
        let lines = vec![MergeLine {
            product_id: ProductId::parse("tee").unwrap(),
            quantity: Quantity::new(2).unwrap(),
        }];
        let json = serde_json::to_value(MergeBody { lines: &lines }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "lines": [{ "product_id": "tee", "quantity": 2 }] })
        );
    }
}
