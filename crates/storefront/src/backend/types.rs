//! Wire types for the REST backend.
//!
//! Every backend response shares one envelope: a `success` flag, an optional
//! `message`, and an endpoint-specific payload field.

use serde::{Deserialize, Serialize};

/// Body of the cart line endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest<'a> {
    /// Product identifier.
    pub item_id: &'a str,
    /// Size label.
    pub size: &'a str,
    /// New quantity (update endpoint only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

/// Empty JSON object body.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EmptyBody {}

/// Response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Whether the backend accepted the request.
    #[serde(default)]
    pub success: bool,
    /// Human-readable reason, mostly set on failure.
    #[serde(default)]
    pub message: Option<String>,
    /// Cart payload (`/api/cart/get`).
    #[serde(default)]
    pub cart_data: Option<serde_json::Value>,
    /// Product payload (`/api/product/list`), parsed per item.
    #[serde(default)]
    pub products: Option<Vec<serde_json::Value>>,
}

impl Envelope {
    /// Failure message for logs.
    #[must_use]
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "(no message provided)".to_string())
    }
}
