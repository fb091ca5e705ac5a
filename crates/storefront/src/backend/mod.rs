//! Remote cart and catalog services.
//!
//! # Architecture
//!
//! - [`CartService`] and [`CatalogService`] are the seams the cart store and
//!   catalog cache depend on; tests substitute in-memory fakes
//! - [`HttpBackend`] implements both against the JSON-over-HTTPS backend
//! - The product list is cached in memory via `moka` (5 minute TTL by
//!   default); cart calls are never cached
//!
//! # Endpoints
//!
//! ```text
//! GET  /api/product/list   - { success, products: [...] }
//! POST /api/cart/add       - { itemId, size }               (bearer token)
//! POST /api/cart/remove    - { itemId, size }               (bearer token)
//! POST /api/cart/update    - { itemId, size, quantity }     (bearer token)
//! POST /api/cart/get       - { success, cartData: {...} }   (bearer token)
//! ```

mod cache;
mod client;
pub mod types;

pub use client::HttpBackend;

use async_trait::async_trait;
use pawpal_core::{Product, ProductId, Quantity, SizeLabel};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
///
/// These never escape the cart store; they are logged and turned into the
/// offline flag.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend answered with a non-success status code.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Backend answered `success: false`.
    #[error("Rejected by backend: {0}")]
    Rejected(String),

    /// A successful envelope lacked the expected payload.
    #[error("Response missing field: {0}")]
    MissingData(&'static str),
}

/// Remote cart endpoint, scoped to the bearer token's user.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Add one unit of a line.
    async fn add(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        size: &SizeLabel,
    ) -> Result<(), RemoteError>;

    /// Remove a line entirely.
    async fn remove(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        size: &SizeLabel,
    ) -> Result<(), RemoteError>;

    /// Set a line's quantity.
    async fn set_quantity(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        size: &SizeLabel,
        quantity: Quantity,
    ) -> Result<(), RemoteError>;

    /// Fetch the server's cart as raw JSON; the caller validates it.
    async fn current_cart(&self, token: &SecretString) -> Result<serde_json::Value, RemoteError>;
}

/// Products returned by [`CatalogService::list_products`].
#[derive(Debug, Clone)]
pub struct ProductList {
    pub products: Vec<Product>,
    /// Answered from the response cache; no request reached the backend.
    pub cached: bool,
}

/// Remote product catalog.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetch every listed product.
    ///
    /// With `allow_cached` false the backend is always contacted.
    async fn list_products(&self, allow_cached: bool) -> Result<ProductList, RemoteError>;
}
