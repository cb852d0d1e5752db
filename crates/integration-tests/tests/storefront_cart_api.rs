//! Storefront cart API tests.
//!
//! Each test drives the real router in-process, carrying the session cookie
//! between requests like a browser would.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::{Method, StatusCode};
use cartbridge_integration_tests::TestApp;
use serde_json::{Value, json};

fn app() -> TestApp {
    TestApp::new(Duration::ZERO)
}

fn line_quantity(body: &Value, product_id: &str) -> Option<u64> {
    body["cart"]["items"]
        .as_array()?
        .iter()
        .find(|item| item["product_id"] == product_id)?
        .get("quantity")?
        .as_u64()
}

async fn sign_in_with(app: &mut TestApp, customer_id: &str, token: &str) -> (StatusCode, Value) {
    app.post(
        "/session/customer",
        json!({ "customer_id": customer_id, "access_token": token }),
    )
    .await
}

async fn sign_in(app: &mut TestApp, customer_id: &str) -> Value {
    let (status, body) = sign_in_with(app, customer_id, "tok").await;
    assert_eq!(status, StatusCode::OK, "sign-in failed: {body}");
    body
}

// ============================================================================
// Basics
// ============================================================================

#[tokio::test]
async fn test_health() {
    let mut app = app();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn test_new_visitor_sees_empty_cart() {
    let mut app = app();
    let (status, body) = app.get("/cart").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"], json!([]));
    assert_eq!(body["loading"], json!(false));
    assert_eq!(body["last_error"], Value::Null);
    assert_eq!(body["reconciliation"], json!("idle"));
}

#[tokio::test]
async fn test_guest_cart_follows_session_cookie() {
    let mut app = app();
    let (status, body) = app
        .post("/cart/lines", json!({ "product_id": "tee", "quantity": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line_quantity(&body, "tee"), Some(2));
    assert_eq!(body["cart"]["item_count"], json!(2));

    let (_, body) = app.get("/cart").await;
    assert_eq!(line_quantity(&body, "tee"), Some(2));

    let mut other = app.new_browser();
    let (_, body) = other.get("/cart").await;
    assert_eq!(body["cart"]["items"], json!([]));
}

#[tokio::test]
async fn test_quantity_defaults_to_one() {
    let mut app = app();
    let (_, body) = app.post("/cart/lines", json!({ "product_id": "mug" })).await;
    assert_eq!(line_quantity(&body, "mug"), Some(1));
}

#[tokio::test]
async fn test_guest_update_and_remove() {
    let mut app = app();
    app.post("/cart/lines", json!({ "product_id": "tee" })).await;
    app.post("/cart/lines", json!({ "product_id": "mug" })).await;

    let (status, body) = app
        .request(Method::PUT, "/cart/lines/tee", Some(json!({ "quantity": 4 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line_quantity(&body, "tee"), Some(4));

    let (status, body) = app.request(Method::DELETE, "/cart/lines/mug", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line_quantity(&body, "mug"), None);

    let (status, body) = app.request(Method::DELETE, "/cart", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"], json!([]));
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_rejects_non_positive_quantity() {
    let mut app = app();
    let (status, body) = app
        .post("/cart/lines", json!({ "product_id": "tee", "quantity": 0 }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_operand"));

    let (_, body) = app.get("/cart").await;
    assert_eq!(body["cart"]["items"], json!([]));
    assert_eq!(body["last_error"], Value::Null);
}

#[tokio::test]
async fn test_rejects_unknown_product() {
    let mut app = app();
    let (status, body) = app
        .post("/cart/lines", json!({ "product_id": "kayak" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_operand"));
}

#[tokio::test]
async fn test_sign_in_requires_customer_id() {
    let mut app = app();
    let (status, _) = app
        .post(
            "/session/customer",
            json!({ "customer_id": "  ", "access_token": "tok" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Login hand-off
// ============================================================================

#[tokio::test]
async fn test_sign_in_merges_guest_cart() {
    let mut app = app();
    app.post("/cart/lines", json!({ "product_id": "tee", "quantity": 2 }))
        .await;

    let diagnostics = sign_in(&mut app, "cust-1").await;
    assert_eq!(diagnostics["state"], json!("committed"));
    assert_eq!(diagnostics["auth"], json!("authenticated"));
    assert_eq!(diagnostics["customer_id"], json!("cust-1"));
    assert_eq!(diagnostics["merge_attempts"], json!(1));

    let (_, body) = app.get("/cart").await;
    assert_eq!(line_quantity(&body, "tee"), Some(2));
    assert_eq!(body["reconciliation"], json!("committed"));

    let remote = app.remote().cart_of("cust-1").unwrap();
    assert_eq!(remote.item_count(), 2);
}

#[tokio::test]
async fn test_failed_merge_keeps_guest_items_visible_and_retries() {
    let mut app = app();
    app.post("/cart/lines", json!({ "product_id": "mug", "quantity": 3 }))
        .await;
    app.remote().fail_next_merges(1);

    let diagnostics = sign_in(&mut app, "cust-2").await;
    assert_eq!(diagnostics["state"], json!("failed"));
    assert_eq!(diagnostics["last_error"], json!("remote_unavailable"));

    // The next render retries the merge before reading.
    let (_, body) = app.get("/cart").await;
    assert_eq!(body["reconciliation"], json!("committed"));
    assert_eq!(line_quantity(&body, "mug"), Some(3));
    assert_eq!(body["last_error"], Value::Null);
    assert_eq!(app.remote().merge_calls(), 2);
}

#[tokio::test]
async fn test_sign_out_returns_to_guest_cart() {
    let mut app = app();
    app.post("/cart/lines", json!({ "product_id": "tee" })).await;
    sign_in(&mut app, "cust-3").await;

    let (status, diagnostics) = app
        .request(Method::DELETE, "/session/customer", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(diagnostics["state"], json!("idle"));
    assert_eq!(diagnostics["auth"], json!("guest"));

    // The merged guest cart was cleared; the customer cart stays remote.
    let (_, body) = app.get("/cart").await;
    assert_eq!(body["cart"]["items"], json!([]));
    assert!(app.remote().cart_of("cust-3").is_some());
}

#[tokio::test]
async fn test_authenticated_mutations_reach_customer_cart() {
    let mut app = app();
    sign_in(&mut app, "cust-4").await;

    let (status, body) = app
        .post("/cart/lines", json!({ "product_id": "tee", "quantity": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line_quantity(&body, "tee"), Some(2));

    let remote = app.remote().cart_of("cust-4").unwrap();
    assert_eq!(remote.item_count(), 2);

    let (_, status_body) = app.get("/cart/status").await;
    assert_eq!(status_body["state"], json!("not_needed"));
}

#[tokio::test]
async fn test_sign_in_with_another_customers_token_is_refused() {
    let mut owner = app();
    let (status, _) = sign_in_with(&mut owner, "alice", "real-secret").await;
    assert_eq!(status, StatusCode::OK);
    owner
        .post("/cart/lines", json!({ "product_id": "mug", "quantity": 3 }))
        .await;

    let mut intruder = owner.new_browser();
    let (status, body) = sign_in_with(&mut intruder, "alice", "forged").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("unauthorized"));

    // Still a guest: the clear lands on the intruder's own empty cart.
    let (status, body) = intruder.request(Method::DELETE, "/cart", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"], json!([]));

    let (_, body) = owner.get("/cart").await;
    assert_eq!(line_quantity(&body, "mug"), Some(3));
    assert_eq!(owner.remote().cart_of("alice").unwrap().item_count(), 3);
}

#[tokio::test]
async fn test_merge_over_line_maximum_keeps_guest_cart() {
    let mut app = app();
    sign_in(&mut app, "cust-5").await;
    app.post("/cart/lines", json!({ "product_id": "tee", "quantity": 5 }))
        .await;
    app.request(Method::DELETE, "/session/customer", None).await;

    app.post("/cart/lines", json!({ "product_id": "tee", "quantity": 9999 }))
        .await;
    let diagnostics = sign_in(&mut app, "cust-5").await;
    assert_eq!(diagnostics["state"], json!("failed"));
    assert_eq!(diagnostics["last_error"], json!("remote_unavailable"));

    let (_, body) = app.get("/cart").await;
    assert_eq!(line_quantity(&body, "tee"), Some(9999));
    assert_eq!(app.remote().cart_of("cust-5").unwrap().item_count(), 5);
}
