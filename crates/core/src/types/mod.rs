//! Core types for PawPal.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod quantity;

pub use cart::{Cart, CartError, CartLine, parse_line_key};
pub use id::{IdError, ProductId, SizeLabel};
pub use price::{Price, PriceError, format_amount};
pub use product::Product;
pub use quantity::{Quantity, QuantityError};
