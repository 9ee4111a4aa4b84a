//! Cart line items.

use serde::{Deserialize, Serialize};

use super::ProductId;

/// One cart entry.
///
/// Two lines with the same [`LineKey`] must never coexist in a cart; the
/// engine's mutation API enforces that by merging on add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product being purchased.
    pub product_id: ProductId,
    /// Size name, matching a key of the product's `sizes` map.
    pub size: String,
    /// Number of units.
    ///
    /// Signed: absolute updates are not validated, so zero or negative
    /// values can be observed.
    pub quantity: i64,
    /// Whether the line is a gift. Missing in older payloads, read as `false`.
    #[serde(default)]
    pub is_gift: bool,
}

impl CartLine {
    /// Create a new line.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, size: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            size: size.into(),
            quantity,
            is_gift: false,
        }
    }

    /// Mark the line as a gift.
    #[must_use]
    pub const fn gift(mut self, is_gift: bool) -> Self {
        self.is_gift = is_gift;
        self
    }

    /// The identity key of this line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            size: self.size.clone(),
            is_gift: self.is_gift,
        }
    }

    /// Whether this line has the given identity key.
    #[must_use]
    pub fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.is_gift == key.is_gift
    }
}

/// Identity key of a cart line: `(product, size, gift flag)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    /// Product id.
    pub product_id: ProductId,
    /// Size name.
    pub size: String,
    /// Gift flag.
    pub is_gift: bool,
}

impl LineKey {
    /// Create a key.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, size: impl Into<String>, is_gift: bool) -> Self {
        Self {
            product_id: product_id.into(),
            size: size.into(),
            is_gift,
        }
    }
}
