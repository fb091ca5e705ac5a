//! PawPal Core - Shared cart and catalog types.
//!
//! This crate provides the types used across all PawPal components:
//! - `storefront` - Cart store, catalog cache, and JSON API
//! - `cli` - Command-line tool driving the cart against a backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere, including in tests that never touch the network.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, size labels, quantities, prices,
//!   products, and the cart itself

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
