//! Cart route handlers.
//!
//! Every mutation responds with the updated cart right away. The remote push
//! keeps running after the response is sent.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use pawpal_core::{CartLine, format_amount};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::services::{CartStore, Mutation, SyncOutcome};
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: String,
    pub size: String,
    pub quantity: u32,
    /// `None` when the product is not in the catalog.
    pub name: Option<String>,
    pub image: Option<String>,
    pub unit_price: Option<String>,
    pub line_price: Option<String>,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u64,
    pub subtotal: String,
    /// Remote sync is paused; changes are only saved locally.
    pub offline: bool,
}

impl CartView {
    /// Render the current cart against the catalog.
    #[must_use]
    pub fn build(store: &CartStore) -> Self {
        let catalog = store.catalog();
        let cart = store.snapshot();
        let items = cart
            .lines()
            .into_iter()
            .map(|CartLine { product_id, size, quantity }| {
                let product = catalog.lookup(product_id.as_str());
                CartLineView {
                    name: product.as_ref().map(|p| p.name.clone()),
                    image: product
                        .as_ref()
                        .and_then(|p| p.primary_image().map(String::from)),
                    unit_price: product.as_ref().map(|p| p.price.display()),
                    line_price: product.map(|p| format_amount(p.price.times(quantity))),
                    product_id: product_id.into_inner(),
                    size: size.into_inner(),
                    quantity: quantity.get(),
                }
            })
            .collect();

        Self {
            items,
            item_count: cart.total_items(),
            subtotal: format_amount(store.total_amount()),
            offline: store.is_offline(),
        }
    }
}

/// Cart count response.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Mutation response.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    pub cart: CartView,
}

/// Sync response.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub outcome: SyncOutcome,
    pub cart: CartView,
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub item_id: String,
    /// Omit for products with no size choice.
    pub size: Option<String>,
}

/// Remove from cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest {
    pub item_id: String,
    pub size: String,
}

/// Update cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub item_id: String,
    pub size: String,
    pub quantity: i64,
}

fn respond(state: &AppState, mutation: Mutation) -> Json<MutationResponse> {
    // Dropping the handle detaches the remote push
    let Mutation { notice, sync: _ } = mutation;
    Json(MutationResponse {
        success: true,
        message: notice.to_string(),
        cart: CartView::build(state.cart()),
    })
}

/// Display the cart.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Json<CartView> {
    Json(CartView::build(state.cart()))
}

/// Total item count (for header badge).
#[instrument(skip(state))]
pub async fn count(State(state): State<AppState>) -> Json<CountResponse> {
    Json(CountResponse {
        count: state.cart().total_item_count(),
    })
}

/// Add one unit to the cart.
///
/// Without a size, the product's only size (or the one-size sentinel for
/// products with no sizes) is used; otherwise the request is rejected.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>> {
    let Json(request) = payload?;
    let size = match request.size {
        Some(size) => size,
        None => state
            .catalog()
            .default_size(&request.item_id)
            .map(|s| s.into_inner())
            .unwrap_or_default(),
    };

    let mutation = state.cart().add_line(&request.item_id, &size)?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", request.item_id.as_str()), ("size", size.as_str())]),
    );
    Ok(respond(&state, mutation))
}

/// Remove a line from the cart.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RemoveFromCartRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>> {
    let Json(request) = payload?;
    let mutation = state.cart().remove_line(&request.item_id, &request.size)?;
    add_breadcrumb(
        "cart",
        "Removed from cart",
        Some(&[("product_id", request.item_id.as_str()), ("size", request.size.as_str())]),
    );
    Ok(respond(&state, mutation))
}

/// Set a line quantity.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UpdateCartRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>> {
    let Json(request) = payload?;
    let mutation = state
        .cart()
        .set_quantity(&request.item_id, &request.size, request.quantity)?;
    let quantity = request.quantity.to_string();
    add_breadcrumb(
        "cart",
        "Updated cart quantity",
        Some(&[
            ("product_id", request.item_id.as_str()),
            ("size", request.size.as_str()),
            ("quantity", quantity.as_str()),
        ]),
    );
    Ok(respond(&state, mutation))
}

/// Leave offline mode and pull the server cart.
#[instrument(skip(state))]
pub async fn sync(State(state): State<AppState>) -> Json<SyncResponse> {
    let outcome = state.cart().resync().await;
    Json(SyncResponse {
        success: true,
        outcome,
        cart: CartView::build(state.cart()),
    })
}
