//! Cart commands.
//!
//! Each command starts like the storefront does: the persisted cart is
//! restored and, with a session token, replaced by the server's. Mutations
//! then wait for their remote push so the process does not exit mid-sync.

use pawpal_core::format_amount;
use pawpal_storefront::services::{Mutation, SyncOutcome};
use pawpal_storefront::state::AppState;

use super::CliError;

/// Reconcile with the server before running a cart command.
pub async fn restore(state: &AppState) {
    match state.cart().reconcile().await {
        SyncOutcome::WentOffline => {
            tracing::warn!("Could not reach the cart service, using the local cart");
        }
        outcome => tracing::debug!(?outcome, "Cart restored"),
    }
}

/// Log cart lines and totals.
pub fn show(state: &AppState) {
    let cart = state.cart();
    let lines = cart.lines();
    if lines.is_empty() {
        tracing::info!("Cart is empty");
        return;
    }

    for line in &lines {
        let product = cart.catalog().lookup(line.product_id.as_str());
        let name = product
            .as_ref()
            .map_or("(unknown product)", |p| p.name.as_str());
        let price = product.as_ref().map_or_else(
            || "-".to_string(),
            |p| format_amount(p.price.times(line.quantity)),
        );
        tracing::info!(
            "{} x{}  {} ({})  {}",
            line.product_id,
            line.quantity,
            name,
            line.size,
            price
        );
    }
    tracing::info!(
        "{} items, subtotal {}",
        cart.total_item_count(),
        format_amount(cart.total_amount())
    );
    if cart.is_offline() {
        tracing::info!("Offline: changes are saved locally only. Run `pawpal cart sync` to retry.");
    }
}

async fn finish(state: &AppState, mutation: Mutation) {
    tracing::info!("{}", mutation.notice);
    if let Some(task) = mutation.sync {
        match task.wait().await {
            SyncOutcome::WentOffline => {
                tracing::warn!("Saved locally; the cart service is unreachable");
            }
            outcome => tracing::debug!(?outcome, "Cart synced"),
        }
    }
    tracing::info!("{} items in cart", state.cart().total_item_count());
}

/// The explicit size, or the product's default when there is exactly one
/// choice. An empty result is rejected by the store as "Select a size".
fn resolve_size(state: &AppState, product_id: &str, size: Option<&str>) -> String {
    match size {
        Some(size) => size.to_string(),
        None => state
            .catalog()
            .default_size(product_id)
            .map(|s| s.into_inner())
            .unwrap_or_default(),
    }
}

/// Add one unit of a product.
pub async fn add(state: &AppState, product_id: &str, size: Option<&str>) -> Result<(), CliError> {
    let size = resolve_size(state, product_id, size);
    let mutation = state.cart().add_line(product_id, &size)?;
    finish(state, mutation).await;
    Ok(())
}

/// Remove a line.
pub async fn remove(
    state: &AppState,
    product_id: &str,
    size: Option<&str>,
) -> Result<(), CliError> {
    let size = resolve_size(state, product_id, size);
    let mutation = state.cart().remove_line(product_id, &size)?;
    finish(state, mutation).await;
    Ok(())
}

/// Set a line quantity.
pub async fn set(
    state: &AppState,
    product_id: &str,
    quantity: i64,
    size: Option<&str>,
) -> Result<(), CliError> {
    let size = resolve_size(state, product_id, size);
    let mutation = state.cart().set_quantity(product_id, &size, quantity)?;
    finish(state, mutation).await;
    Ok(())
}

/// Leave offline mode and pull the server cart.
pub async fn sync(state: &AppState) {
    match state.cart().resync().await {
        SyncOutcome::Synced => tracing::info!("Cart synced with the server"),
        SyncOutcome::Skipped => tracing::info!("No session token configured, nothing to sync"),
        SyncOutcome::WentOffline => tracing::warn!("Cart service unreachable, still offline"),
        SyncOutcome::Stale | SyncOutcome::Aborted => {
            tracing::warn!("Sync did not complete, try again");
        }
    }
    show(state);
}

/// Empty the local cart.
pub fn clear(state: &AppState) {
    let mutation = state.cart().clear();
    tracing::info!("{}", mutation.notice);
}
