//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Product list cache with sample fallback
//! - `cart` - Cart state store (local persistence plus remote sync)

pub mod cart;
pub mod catalog;

pub use cart::{CART_STORAGE_KEY, CartNotice, CartStore, Mutation, SyncOutcome, SyncTask};
pub use catalog::{CatalogCache, LoadOutcome, sample_products};
