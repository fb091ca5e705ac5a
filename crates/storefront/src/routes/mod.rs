//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Products
//! GET  /api/products           - Product list (sample catalog when offline)
//! GET  /api/products/{id}      - Single product
//! POST /api/products/refresh   - Refetch the catalog
//!
//! # Cart
//! GET  /api/cart               - Cart with line prices and subtotal
//! GET  /api/cart/count         - Total item count (badge)
//! POST /api/cart/add           - Add one unit of a product/size
//! POST /api/cart/remove        - Remove a product/size line
//! POST /api/cart/update        - Set a line quantity (<= 0 removes)
//! POST /api/cart/sync          - Leave offline mode and reconcile
//! ```
//!
//! Mutations answer as soon as the local cart is committed. Remote sync runs
//! in the background and shows up in later reads.

pub mod cart;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/refresh", post(products::refresh))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/update", post(cart::update))
        .route("/sync", post(cart::sync))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
pub async fn health() -> &'static str {
    "ok"
}
