//! CLI command implementations.

pub mod cart;
pub mod products;

use pawpal_core::CartError;
use pawpal_storefront::config::{ConfigError, StorefrontConfig};
use pawpal_storefront::services::LoadOutcome;
use pawpal_storefront::state::{AppState, StateError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stores could not be built.
    #[error("Startup error: {0}")]
    State(#[from] StateError),

    /// The cart change was rejected.
    #[error("{0}")]
    Cart(#[from] CartError),
}

/// Load configuration, build the stores and load the catalog.
pub async fn startup() -> Result<AppState, CliError> {
    let config = StorefrontConfig::from_env()?;
    let state = AppState::from_config(&config)?;

    if state.catalog().load().await == LoadOutcome::Fallback {
        tracing::warn!("Backend unreachable, showing sample products and working offline");
    }
    Ok(state)
}
