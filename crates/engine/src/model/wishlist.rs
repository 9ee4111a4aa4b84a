use serde::{Deserialize, Serialize};
use storefront_sync_core::ProductId;

/// Set of wishlisted product ids, kept in insertion order for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ProductId>", into = "Vec<ProductId>")]
pub struct Wishlist {
    ids: Vec<ProductId>,
}

impl Wishlist {
    /// Create an empty wishlist.
    #[must_use]
    pub const fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Product ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the wishlist is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is wishlisted.
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.ids.contains(id)
    }

    /// Remove `id` if present, append it otherwise.
    #[must_use]
    pub fn toggle(&self, id: &ProductId) -> Self {
        let ids = if self.contains(id) {
            self.ids.iter().filter(|i| *i != id).cloned().collect()
        } else {
            let mut ids = self.ids.clone();
            ids.push(id.clone());
            ids
        };
        Self { ids }
    }
}

impl From<Vec<ProductId>> for Wishlist {
    fn from(raw: Vec<ProductId>) -> Self {
        let mut ids: Vec<ProductId> = Vec::with_capacity(raw.len());
        for id in raw {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Self { ids }
    }
}

impl From<Wishlist> for Vec<ProductId> {
    fn from(wishlist: Wishlist) -> Self {
        wishlist.ids
    }
}
