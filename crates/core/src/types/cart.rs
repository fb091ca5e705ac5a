//! The cart: product → size → quantity.
//!
//! [`Cart`] upholds two invariants by construction:
//!
//! - every quantity is at least 1 (see [`Quantity`])
//! - every product maps to a non-empty set of sizes
//!
//! Mutators prune as they go, and [`Cart::validate`] is the only way to turn
//! untrusted JSON (local storage, network responses) into a cart.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use super::id::{IdError, ProductId, SizeLabel};
use super::price::Price;
use super::quantity::Quantity;

/// Errors surfaced to the user when a cart operation is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No size was picked for the product.
    #[error("Select a size")]
    SizeRequired,
    /// The size label is present but unusable (e.g. too long).
    #[error("Invalid size: {0}")]
    InvalidSize(IdError),
    /// The product identifier is empty or malformed.
    #[error("Invalid product: {0}")]
    InvalidProduct(IdError),
}

/// Parse the `(product, size)` key of a cart line from raw request input.
///
/// # Errors
///
/// Returns [`CartError::SizeRequired`] for a blank size, and
/// [`CartError::InvalidProduct`] / [`CartError::InvalidSize`] for other
/// malformed input.
pub fn parse_line_key(product_id: &str, size: &str) -> Result<(ProductId, SizeLabel), CartError> {
    let size = match SizeLabel::parse(size) {
        Ok(size) => size,
        Err(IdError::Empty) => return Err(CartError::SizeRequired),
        Err(e) => return Err(CartError::InvalidSize(e)),
    };
    let product = ProductId::parse(product_id).map_err(CartError::InvalidProduct)?;
    Ok((product, size))
}

/// One flattened cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product the line refers to.
    pub product_id: ProductId,
    /// Variant of the product.
    pub size: SizeLabel,
    /// Units in the cart.
    pub quantity: Quantity,
}

type Sizes = BTreeMap<SizeLabel, Quantity>;

/// Mapping of product to size to quantity.
///
/// Serializes to the backend's `cartData` shape:
///
/// ```json
/// { "harness-01": { "M": 2, "L": 1 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: BTreeMap<ProductId, Sizes>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from untrusted JSON, dropping anything malformed.
    ///
    /// Only JSON integers in `1..=u32::MAX` are accepted as quantities.
    /// Strings are *not* coerced, so `{"a": {"S": "2"}}` yields an empty cart.
    /// Invalid product ids or size labels are dropped, and products left with
    /// no sizes are pruned. A non-object input yields the empty cart. This
    /// never fails.
    #[must_use]
    pub fn validate(candidate: &Value) -> Self {
        let Some(products) = candidate.as_object() else {
            return Self::new();
        };

        let mut items = BTreeMap::new();
        for (raw_product, raw_sizes) in products {
            let Ok(product) = ProductId::parse(raw_product.as_str()) else {
                continue;
            };
            let Some(raw_sizes) = raw_sizes.as_object() else {
                continue;
            };

            let sizes: Sizes = raw_sizes
                .iter()
                .filter_map(|(raw_size, raw_quantity)| {
                    let size = SizeLabel::parse(raw_size.as_str()).ok()?;
                    let quantity = raw_quantity
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .and_then(Quantity::new)?;
                    Some((size, quantity))
                })
                .collect();

            if !sizes.is_empty() {
                items.insert(product, sizes);
            }
        }

        Self { items }
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error only if `json` is not syntactically valid JSON;
    /// semantically malformed entries are dropped by [`Cart::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::validate(&value))
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity of one line, if present.
    #[must_use]
    pub fn quantity(&self, product_id: &str, size: &str) -> Option<Quantity> {
        self.items.get(product_id)?.get(size).copied()
    }

    /// Add one unit to a line, creating it at 1 if absent.
    pub fn increment(&mut self, product_id: ProductId, size: SizeLabel) -> Quantity {
        let sizes = self.items.entry(product_id).or_default();
        let quantity = sizes
            .get(&size)
            .map_or(Quantity::ONE, |q| q.incremented());
        sizes.insert(size, quantity);
        quantity
    }

    /// Remove a line, pruning the product if it has no sizes left.
    ///
    /// Returns the removed quantity, or `None` if the line did not exist.
    pub fn remove(&mut self, product_id: &str, size: &str) -> Option<Quantity> {
        let sizes = self.items.get_mut(product_id)?;
        let removed = sizes.remove(size);
        if sizes.is_empty() {
            self.items.remove(product_id);
        }
        removed
    }

    /// Set a line's quantity; `quantity <= 0` removes the line.
    ///
    /// Returns the quantity now stored for the line.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        size: SizeLabel,
        quantity: i64,
    ) -> Option<Quantity> {
        match Quantity::from_signed(quantity) {
            Some(q) => {
                self.items.entry(product_id).or_default().insert(size, q);
                Some(q)
            }
            None => {
                self.remove(product_id.as_str(), size.as_str());
                None
            }
        }
    }

    /// Drop products whose size mapping became empty.
    pub fn prune(&mut self) {
        self.items.retain(|_, sizes| !sizes.is_empty());
    }

    /// Sum of every quantity in the cart.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.iter().map(|(_, _, q)| u64::from(q.get())).sum()
    }

    /// Sum of `price × quantity` over lines whose price is known.
    ///
    /// Lines for which `price_of` returns `None` contribute nothing. This is
    /// intentionally fail-open: an unknown product usually means the catalog
    /// has not loaded yet or the product was delisted.
    pub fn total_amount<F>(&self, mut price_of: F) -> Decimal
    where
        F: FnMut(&ProductId) -> Option<Price>,
    {
        self.items
            .iter()
            .filter_map(|(product, sizes)| {
                let price = price_of(product)?;
                Some(sizes.values().map(|q| price.times(*q)).sum::<Decimal>())
            })
            .sum()
    }

    /// Iterate over `(product, size, quantity)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, &SizeLabel, Quantity)> {
        self.items
            .iter()
            .flat_map(|(p, sizes)| sizes.iter().map(move |(s, q)| (p, s, *q)))
    }

    /// Flattened owned lines in key order.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.iter()
            .map(|(product_id, size, quantity)| CartLine {
                product_id: product_id.clone(),
                size: size.clone(),
                quantity,
            })
            .collect()
    }
}
