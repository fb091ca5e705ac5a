//! Product catalog cache.
//!
//! The product list is fetched once at startup via [`CatalogCache::load`] and
//! replaced wholesale on refresh. When the fetch fails a built-in two-product
//! sample catalog is served so product-dependent screens still render; it is
//! a degraded mode, not a copy of real data.

use std::sync::{Arc, PoisonError, RwLock};

use pawpal_core::{Price, Product, SizeLabel};
use tracing::instrument;

use crate::backend::{CatalogService, ProductList};
use crate::connectivity::Connectivity;

/// Placeholder products served when the catalog cannot be fetched.
const SAMPLE_CATALOG: &str = r#"[
    {
        "_id": "sample-kibble",
        "name": "Sample Dry Kibble",
        "description": "Placeholder product shown while the catalog is unavailable.",
        "price": 19.99,
        "category": "Dogs",
        "subCategory": "Food",
        "sizes": [],
        "stock": 0,
        "image": []
    },
    {
        "_id": "sample-harness",
        "name": "Sample Harness",
        "description": "Placeholder product shown while the catalog is unavailable.",
        "price": 24.5,
        "category": "Dogs",
        "subCategory": "Walking",
        "sizes": ["S", "M", "L"],
        "stock": 0,
        "image": []
    }
]"#;

/// The built-in sample catalog.
#[must_use]
pub fn sample_products() -> Vec<Product> {
    serde_json::from_str(SAMPLE_CATALOG).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Built-in sample catalog is malformed");
        Vec::new()
    })
}

/// Result of [`CatalogCache::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Real products were loaded.
    Loaded(usize),
    /// The fetch failed; the sample catalog is in use.
    Fallback,
}

/// In-memory product list shared by the cart store and route handlers.
///
/// Cloning shares the same list.
#[derive(Clone)]
pub struct CatalogCache {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    service: Arc<dyn CatalogService>,
    connectivity: Connectivity,
    state: RwLock<CatalogState>,
}

#[derive(Default)]
struct CatalogState {
    products: Arc<Vec<Product>>,
    fallback: bool,
}

impl CatalogCache {
    /// Create an empty cache. Call [`CatalogCache::load`] to populate it.
    #[must_use]
    pub fn new(service: Arc<dyn CatalogService>, connectivity: Connectivity) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                service,
                connectivity,
                state: RwLock::new(CatalogState::default()),
            }),
        }
    }

    /// Fetch the product list, falling back to the sample catalog on failure.
    ///
    /// A request that reaches the backend clears the offline flag; failure
    /// sets it. A cached answer leaves the flag alone. While offline the
    /// cache is skipped.
    #[instrument(skip(self))]
    pub async fn load(&self) -> LoadOutcome {
        let allow_cached = !self.inner.connectivity.is_offline();
        match self.inner.service.list_products(allow_cached).await {
            Ok(ProductList { products, cached }) => {
                let count = products.len();
                self.replace(products, false);
                if !cached {
                    self.inner.connectivity.mark_online();
                }
                tracing::info!(count, cached, "Catalog loaded");
                LoadOutcome::Loaded(count)
            }
            Err(e) => {
                self.inner.connectivity.mark_offline(&e);
                self.replace(sample_products(), true);
                tracing::warn!(error = %e, "Catalog unavailable, serving sample products");
                LoadOutcome::Fallback
            }
        }
    }

    fn replace(&self, products: Vec<Product>, fallback: bool) {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        state.products = Arc::new(products);
        state.fallback = fallback;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CatalogState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Find a product by id.
    #[must_use]
    pub fn lookup(&self, product_id: &str) -> Option<Product> {
        self.read()
            .products
            .iter()
            .find(|p| p.id.as_str() == product_id)
            .cloned()
    }

    /// Unit price of a product, if it is in the catalog.
    #[must_use]
    pub fn price_of(&self, product_id: &str) -> Option<Price> {
        self.read()
            .products
            .iter()
            .find(|p| p.id.as_str() == product_id)
            .map(|p| p.price)
    }

    /// The size to use when the caller did not pick one (see
    /// [`Product::default_size`]).
    #[must_use]
    pub fn default_size(&self, product_id: &str) -> Option<SizeLabel> {
        self.lookup(product_id)?.default_size()
    }

    /// Snapshot of the current list.
    #[must_use]
    pub fn products(&self) -> Arc<Vec<Product>> {
        Arc::clone(&self.read().products)
    }

    /// Whether the sample catalog is being served.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.read().fallback
    }

    /// The connectivity flag this cache reports to.
    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.inner.connectivity
    }
}
