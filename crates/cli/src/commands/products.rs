//! Catalog listing.

use pawpal_storefront::state::AppState;

/// Log every catalog product with its price and sizes.
pub async fn list(state: &AppState, refresh: bool) {
    if refresh {
        state.refresh_catalog().await;
    }

    let catalog = state.catalog();
    let products = catalog.products();
    if catalog.is_fallback() {
        tracing::info!("Sample catalog (backend unavailable):");
    }

    for product in products.iter() {
        let sizes = if product.sizes.is_empty() {
            "one size".to_string()
        } else {
            product
                .sizes
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        tracing::info!(
            "{}  {}  {}  [{}]{}",
            product.id,
            product.name,
            product.price.display(),
            sizes,
            if product.in_stock() { "" } else { "  (out of stock)" }
        );
    }
    tracing::info!("{} products", products.len());
}
