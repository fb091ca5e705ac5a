//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use pawpal_core::Product;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::LoadOutcome;
use crate::state::AppState;

/// Product list response.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub success: bool,
    pub products: Vec<Product>,
    /// The sample catalog is being served because the fetch failed.
    pub fallback: bool,
    pub offline: bool,
}

/// Single product response.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub success: bool,
    pub product: Product,
}

/// Catalog refresh response.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
    pub fallback: bool,
}

/// Display the product list.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Json<ProductListResponse> {
    let catalog = state.catalog();
    Json(ProductListResponse {
        success: true,
        products: catalog.products().as_ref().clone(),
        fallback: catalog.is_fallback(),
        offline: catalog.connectivity().is_offline(),
    })
}

/// Display a single product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>> {
    let product = state
        .catalog()
        .lookup(&id)
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {id}")))?;

    Ok(Json(ProductResponse {
        success: true,
        product,
    }))
}

/// Refetch the catalog from the backend.
#[instrument(skip(state))]
pub async fn refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let outcome = state.refresh_catalog().await;
    let count = state.catalog().products().len();
    let (message, fallback) = match outcome {
        LoadOutcome::Loaded(_) => ("Catalog refreshed", false),
        LoadOutcome::Fallback => ("Catalog unavailable, showing sample products", true),
    };

    Json(RefreshResponse {
        success: true,
        message: message.to_string(),
        count,
        fallback,
    })
}
