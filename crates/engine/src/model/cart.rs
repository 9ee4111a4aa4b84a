use serde::{Deserialize, Serialize};
use storefront_sync_core::{CartLine, LineKey};
use tracing::debug;

/// Ordered collection of cart lines with unique [`LineKey`]s.
///
/// Serialized as a bare array of lines. Loading merges duplicate keys by
/// summing quantities, so stored or remote data cannot break uniqueness.
/// Quantity arithmetic saturates instead of overflowing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from raw lines, merging duplicate keys in first-seen order.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut merged: Vec<CartLine> = Vec::new();
        for line in lines {
            let key = line.key();
            if let Some(existing) = merged.iter_mut().find(|l| l.matches(&key)) {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            } else {
                merged.push(line);
            }
        }
        Self { lines: merged }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of lines (not units).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities across all lines, saturating at the `i64` bounds.
    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.lines
            .iter()
            .fold(0_i64, |total, l| total.saturating_add(l.quantity))
    }

    /// The line with the given key, if any.
    #[must_use]
    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(key))
    }

    /// Add `quantity` units under `key`.
    ///
    /// An existing line with the same key has its quantity incremented;
    /// otherwise a new line is appended. A non-positive `quantity` leaves the
    /// cart unchanged.
    #[must_use]
    pub fn add(&self, key: &LineKey, quantity: i64) -> Self {
        if quantity < 1 {
            debug!(
                product_id = %key.product_id,
                quantity,
                "Ignoring add with non-positive quantity"
            );
            return self.clone();
        }

        let mut lines = self.lines.clone();
        if let Some(existing) = lines.iter_mut().find(|l| l.matches(key)) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            lines.push(CartLine {
                product_id: key.product_id.clone(),
                size: key.size.clone(),
                quantity,
                is_gift: key.is_gift,
            });
        }
        Self { lines }
    }

    /// Set the quantity of the line under `key` to an absolute value.
    ///
    /// Not validated: zero or negative values are stored as given.
    #[must_use]
    pub fn set_quantity(&self, key: &LineKey, quantity: i64) -> Self {
        let lines = self
            .lines
            .iter()
            .map(|l| {
                if l.matches(key) {
                    CartLine {
                        quantity,
                        ..l.clone()
                    }
                } else {
                    l.clone()
                }
            })
            .collect();
        Self { lines }
    }

    /// Move the line under `key` to `new_size`.
    ///
    /// If a line already exists under the new key, the moved line's quantity
    /// is folded into it and the moved line is dropped.
    #[must_use]
    pub fn set_size(&self, key: &LineKey, new_size: &str) -> Self {
        if key.size == new_size {
            return self.clone();
        }
        let Some(moving) = self.line(key) else {
            return self.clone();
        };

        let target = LineKey {
            size: new_size.to_string(),
            ..key.clone()
        };
        if self.line(&target).is_some() {
            let quantity = moving.quantity;
            let lines = self
                .lines
                .iter()
                .filter(|l| !l.matches(key))
                .map(|l| {
                    if l.matches(&target) {
                        CartLine {
                            quantity: l.quantity.saturating_add(quantity),
                            ..l.clone()
                        }
                    } else {
                        l.clone()
                    }
                })
                .collect();
            return Self { lines };
        }

        let lines = self
            .lines
            .iter()
            .map(|l| {
                if l.matches(key) {
                    CartLine {
                        size: new_size.to_string(),
                        ..l.clone()
                    }
                } else {
                    l.clone()
                }
            })
            .collect();
        Self { lines }
    }

    /// Remove the line under `key`. No-op if absent.
    #[must_use]
    pub fn remove(&self, key: &LineKey) -> Self {
        Self {
            lines: self
                .lines
                .iter()
                .filter(|l| !l.matches(key))
                .cloned()
                .collect(),
        }
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Self::from_lines(lines)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}
