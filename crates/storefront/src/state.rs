//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{HttpBackend, RemoteError};
use crate::config::StorefrontConfig;
use crate::connectivity::Connectivity;
use crate::services::{CartStore, CatalogCache};
use crate::session::SessionSlot;
use crate::storage::FileStore;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build backend client: {0}")]
    Backend(#[from] RemoteError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and gives access to the
/// catalog and the cart store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    backend: HttpBackend,
    catalog: CatalogCache,
    cart: CartStore,
}

impl AppState {
    /// Wire up the HTTP backend, file storage and stores from configuration.
    ///
    /// Nothing is fetched here; call [`CatalogCache::load`] and
    /// [`CartStore::reconcile`] once the runtime is up.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, StateError> {
        let backend = HttpBackend::new(&config.backend)?;
        let catalog = CatalogCache::new(Arc::new(backend.clone()), Connectivity::new());
        let session = SessionSlot::new(config.session_token.clone());
        let cart = CartStore::new(
            Arc::new(FileStore::new(config.data_dir.clone())),
            Arc::new(backend.clone()),
            Arc::new(session.clone()),
            catalog.clone(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                backend,
                catalog,
                cart,
            }),
        })
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Reload the catalog, bypassing the HTTP response cache.
    pub async fn refresh_catalog(&self) -> crate::services::LoadOutcome {
        self.inner.backend.invalidate_catalog().await;
        self.inner.catalog.load().await
    }
}
