//! Catalog product record.

use serde::{Deserialize, Serialize};

use super::id::{ProductId, SizeLabel};
use super::price::Price;

/// A marketplace product as served by the catalog endpoint.
///
/// Read-only from the cart's point of view: products are loaded once and
/// replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend identifier.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Top-level category (e.g. "Dogs").
    #[serde(default)]
    pub category: String,
    /// Sub-category (e.g. "Food").
    #[serde(default)]
    pub sub_category: String,
    /// Size variants offered; empty for size-less products.
    #[serde(default)]
    pub sizes: Vec<SizeLabel>,
    /// Units in stock.
    #[serde(default)]
    pub stock: u32,
    /// Image URLs, first one is the primary image.
    #[serde(default, rename = "image")]
    pub images: Vec<String>,
    /// Featured on the landing page.
    #[serde(default)]
    pub bestseller: bool,
}

impl Product {
    /// The size to use when the caller did not pick one.
    ///
    /// Size-less products use [`SizeLabel::one_size`]; a product with exactly
    /// one size uses that size. Products with a real choice return `None`.
    #[must_use]
    pub fn default_size(&self) -> Option<SizeLabel> {
        match self.sizes.as_slice() {
            [] => Some(SizeLabel::one_size()),
            [only] => Some(only.clone()),
            _ => None,
        }
    }

    /// Primary image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether any units are in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
