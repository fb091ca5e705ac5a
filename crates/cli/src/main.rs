//! PawPal CLI - cart and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # List products (sample products if the backend is unreachable)
//! pawpal products
//!
//! # Show the cart
//! pawpal cart show
//!
//! # Add one unit (size can be omitted for single-size products)
//! pawpal cart add 64f0c2 --size M
//!
//! # Set a quantity (0 removes the line)
//! pawpal cart set 64f0c2 3 --size M
//!
//! # Leave offline mode and pull the server cart
//! pawpal cart sync
//! ```
//!
//! Configuration is read from the environment (and `.env`), the same way the
//! storefront server reads it.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pawpal")]
#[command(author, version, about = "PawPal cart and catalog tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products {
        /// Bypass the HTTP cache
        #[arg(long)]
        refresh: bool,
    },
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        product_id: String,

        /// Size label (defaults to the product's only size)
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Remove a product/size line
    Remove {
        /// Product ID
        product_id: String,

        /// Size label (defaults to the product's only size)
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Set the quantity of a product/size line
    Set {
        /// Product ID
        product_id: String,

        /// New quantity (0 or less removes the line)
        #[arg(allow_hyphen_values = true)]
        quantity: i64,

        /// Size label (defaults to the product's only size)
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Leave offline mode and replace the local cart with the server's
    Sync,
    /// Empty the local cart
    Clear,
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pawpal_cli=info,pawpal_storefront=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let state = commands::startup().await?;

    match cli.command {
        Commands::Products { refresh } => commands::products::list(&state, refresh).await,
        Commands::Cart { action } => {
            commands::cart::restore(&state).await;
            match action {
                CartAction::Show => commands::cart::show(&state),
                CartAction::Add { product_id, size } => {
                    commands::cart::add(&state, &product_id, size.as_deref()).await?;
                }
                CartAction::Remove { product_id, size } => {
                    commands::cart::remove(&state, &product_id, size.as_deref()).await?;
                }
                CartAction::Set {
                    product_id,
                    quantity,
                    size,
                } => commands::cart::set(&state, &product_id, quantity, size.as_deref()).await?,
                CartAction::Sync => commands::cart::sync(&state).await,
                CartAction::Clear => commands::cart::clear(&state),
            }
        }
    }
    Ok(())
}
