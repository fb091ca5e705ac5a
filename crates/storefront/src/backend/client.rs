//! HTTP implementation of the cart and catalog services.
//!
//! Uses `reqwest` for HTTP and caches the product list with `moka`.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use pawpal_core::{Product, ProductId, Quantity, SizeLabel};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::types::{EmptyBody, Envelope, LineRequest};
use super::{CartService, CatalogService, ProductList, RemoteError};
use crate::config::BackendConfig;

/// Response bodies are truncated to this many characters in errors and logs.
const BODY_PREVIEW_CHARS: usize = 200;

/// Client for the PawPal REST backend.
///
/// Cheaply cloneable; clones share the connection pool and cache.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl HttpBackend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. TLS backend
    /// initialization failure).
    pub fn new(config: &BackendConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.catalog_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    /// Drop the cached product list so the next fetch hits the network.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate(&CacheKey::ProductList).await;
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// POST a JSON body and unwrap the response envelope.
    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<Envelope, RemoteError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(path))
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;

        read_envelope(response).await
    }

    /// GET an endpoint and unwrap the response envelope.
    async fn get(&self, path: &str) -> Result<Envelope, RemoteError> {
        let response = self.inner.client.get(self.endpoint(path)).send().await?;
        read_envelope(response).await
    }
}

/// Turn an HTTP response into a successful [`Envelope`] or an error.
async fn read_envelope(response: reqwest::Response) -> Result<Envelope, RemoteError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(RemoteError::RateLimited(retry_after));
    }

    // Read as text first for better error diagnostics
    let text = response.text().await?;

    if !status.is_success() {
        return Err(RemoteError::Status {
            status: status.as_u16(),
            body: text.chars().take(BODY_PREVIEW_CHARS).collect(),
        });
    }

    let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
        tracing::debug!(
            error = %e,
            body = %text.chars().take(BODY_PREVIEW_CHARS).collect::<String>(),
            "Failed to parse backend response"
        );
        RemoteError::Parse(e)
    })?;

    if !envelope.success {
        return Err(RemoteError::Rejected(envelope.failure_message()));
    }

    Ok(envelope)
}

#[async_trait]
impl CartService for HttpBackend {
    #[instrument(skip(self, token), fields(product_id = %product_id, size = %size))]
    async fn add(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        size: &SizeLabel,
    ) -> Result<(), RemoteError> {
        let body = LineRequest {
            item_id: product_id.as_str(),
            size: size.as_str(),
            quantity: None,
        };
        self.post("/api/cart/add", token, &body).await.map(drop)
    }

    #[instrument(skip(self, token), fields(product_id = %product_id, size = %size))]
    async fn remove(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        size: &SizeLabel,
    ) -> Result<(), RemoteError> {
        let body = LineRequest {
            item_id: product_id.as_str(),
            size: size.as_str(),
            quantity: None,
        };
        self.post("/api/cart/remove", token, &body).await.map(drop)
    }

    #[instrument(skip(self, token), fields(product_id = %product_id, size = %size, quantity = %quantity))]
    async fn set_quantity(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        size: &SizeLabel,
        quantity: Quantity,
    ) -> Result<(), RemoteError> {
        let body = LineRequest {
            item_id: product_id.as_str(),
            size: size.as_str(),
            quantity: Some(quantity.get()),
        };
        self.post("/api/cart/update", token, &body).await.map(drop)
    }

    #[instrument(skip(self, token))]
    async fn current_cart(&self, token: &SecretString) -> Result<serde_json::Value, RemoteError> {
        let envelope = self.post("/api/cart/get", token, &EmptyBody {}).await?;
        envelope.cart_data.ok_or(RemoteError::MissingData("cartData"))
    }
}

#[async_trait]
impl CatalogService for HttpBackend {
    #[instrument(skip(self))]
    async fn list_products(&self, allow_cached: bool) -> Result<ProductList, RemoteError> {
        if allow_cached
            && let Some(CacheValue::Products(products)) =
                self.inner.cache.get(&CacheKey::ProductList).await
        {
            debug!("Cache hit for product list");
            return Ok(ProductList {
                products: products.as_ref().clone(),
                cached: true,
            });
        }

        let envelope = self.get("/api/product/list").await?;
        let raw = envelope
            .products
            .ok_or(RemoteError::MissingData("products"))?;

        // One malformed product should not hide the rest of the catalog
        let total = raw.len();
        let products: Vec<Product> = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Product>(value) {
                Ok(product) => Some(product),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed product");
                    None
                }
            })
            .collect();
        if products.len() < total {
            tracing::warn!(
                skipped = total - products.len(),
                total,
                "Catalog contained malformed products"
            );
        }

        self.inner
            .cache
            .insert(
                CacheKey::ProductList,
                CacheValue::Products(Arc::new(products.clone())),
            )
            .await;

        Ok(ProductList {
            products,
            cached: false,
        })
    }
}
