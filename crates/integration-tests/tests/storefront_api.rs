//! The storefront JSON API served over real HTTP.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pawpal_integration_tests::{MockMarketplace, TEST_TOKEN, config_for, product_json};
use pawpal_storefront::state::AppState;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

struct Storefront {
    base_url: String,
    client: Client,
}

impl Storefront {
    async fn start(mock: &MockMarketplace, dir: &TempDir, token: Option<&str>) -> Self {
        let state =
            AppState::from_config(&config_for(&mock.base_url(), dir.path(), token)).unwrap();
        state.catalog().load().await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = pawpal_storefront::app(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }
}

async fn marketplace() -> MockMarketplace {
    MockMarketplace::start(vec![
        product_json("harness", "Reflective Harness", 24.5, &["S", "M", "L"]),
        product_json("bowl", "Steel Bowl", 9.99, &[]),
    ])
    .await
}

#[tokio::test]
async fn health_carries_request_id() {
    let mock = marketplace().await;
    let dir = TempDir::new().unwrap();
    let storefront = Storefront::start(&mock, &dir, None).await;

    let response = storefront
        .client
        .get(format!("{}/health", storefront.base_url))
        .header("x-request-id", "edge-42")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "edge-42");
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn local_cart_flow() {
    let mock = marketplace().await;
    let dir = TempDir::new().unwrap();
    let storefront = Storefront::start(&mock, &dir, None).await;

    let (status, body) = storefront
        .post("/api/cart/add", &json!({ "itemId": "harness" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Select a size");

    let (status, _) = storefront
        .post("/api/cart/add", &json!({ "itemId": "harness", "size": "M" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = storefront
        .post("/api/cart/add", &json!({ "itemId": "bowl" }))
        .await;
    assert_eq!(body["cart"]["itemCount"], 2);
    assert_eq!(body["cart"]["subtotal"], "$34.49");

    let (_, body) = storefront.get("/api/cart/count").await;
    assert_eq!(body["count"], 2);

    let (_, body) = storefront
        .post(
            "/api/cart/update",
            &json!({ "itemId": "harness", "size": "M", "quantity": -2 }),
        )
        .await;
    assert_eq!(body["message"], "Removed from cart");

    let (_, body) = storefront.get("/api/cart").await;
    assert_eq!(
        body["items"],
        json!([{
            "productId": "bowl",
            "size": "one-size",
            "quantity": 1,
            "name": "Steel Bowl",
            "image": "https://cdn.pawpal.example/bowl.jpg",
            "unitPrice": "$9.99",
            "linePrice": "$9.99",
        }])
    );
    assert_eq!(body["offline"], false);
    assert_eq!(mock.request_paths(), ["/api/product/list"]);
}

#[tokio::test]
async fn signed_in_mutations_sync_in_background() {
    let mock = marketplace().await;
    let dir = TempDir::new().unwrap();
    let storefront = Storefront::start(&mock, &dir, Some(TEST_TOKEN)).await;

    let (status, body) = storefront
        .post("/api/cart/add", &json!({ "itemId": "harness", "size": "L" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["itemCount"], 1);

    // The response does not wait for the push
    let mut synced = false;
    for _ in 0..100 {
        if mock.server_cart() == json!({ "harness": { "L": 1 } }) {
            synced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(synced, "server cart never received the line");

    let (_, body) = storefront.post("/api/cart/sync", &json!({})).await;
    assert_eq!(body["outcome"], "synced");
    assert_eq!(body["cart"]["items"][0]["productId"], "harness");
}

#[tokio::test]
async fn products_endpoints() {
    let mock = marketplace().await;
    let dir = TempDir::new().unwrap();
    let storefront = Storefront::start(&mock, &dir, None).await;

    let (_, body) = storefront.get("/api/products").await;
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
    assert_eq!(body["fallback"], false);

    let (status, body) = storefront.get("/api/products/harness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["sizes"], json!(["S", "M", "L"]));

    let (status, _) = storefront.get("/api/products/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
