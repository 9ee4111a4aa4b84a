//! Ordered product cache with incremental updates.

use storefront_sync_core::{ProductRecord, PushEvent};
use tracing::debug;

use super::placeholder_catalog;

/// Ordered sequence of products, addressed by id.
///
/// Every record matches on its canonical id or on the alternate id it was
/// ingested with. All `apply_*` operations are idempotent: replaying the same
/// event yields the same cache.
#[derive(Debug, Clone, Default)]
pub struct CatalogCache {
    records: Vec<ProductRecord>,
    placeholder: bool,
}

impl CatalogCache {
    /// Create an empty cache (nothing loaded yet).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            placeholder: false,
        }
    }

    /// Replace the whole cache. An empty `records` installs the placeholder set.
    pub fn bulk_load(&mut self, records: Vec<ProductRecord>) {
        if records.is_empty() {
            self.records = placeholder_catalog();
            self.placeholder = true;
        } else {
            self.records = records;
            self.placeholder = false;
        }
    }

    /// Whether the cache currently holds the diagnostic placeholder set.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Number of cached products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Products in display order.
    pub fn iter(&self) -> impl Iterator<Item = &ProductRecord> {
        self.records.iter()
    }

    /// Products as a slice.
    #[must_use]
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    /// Look up a product by either id scheme.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ProductRecord> {
        self.records.iter().find(|r| r.matches(id))
    }

    fn position_of(&self, record: &ProductRecord) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.matches(record.id.as_str()) || record.matches(r.id.as_str()))
    }

    /// Prepend a new product. A record whose id is already cached replaces
    /// that entry in place, so a replayed create does not duplicate it.
    pub fn apply_created(&mut self, record: ProductRecord) {
        match self.position_of(&record) {
            Some(index) => {
                if let Some(slot) = self.records.get_mut(index) {
                    *slot = record;
                }
            }
            None => self.records.insert(0, record),
        }
    }

    /// Replace the matching product. Returns `false` if nothing matched.
    pub fn apply_updated(&mut self, record: ProductRecord) -> bool {
        let Some(slot) = self
            .position_of(&record)
            .and_then(|index| self.records.get_mut(index))
        else {
            return false;
        };
        *slot = record;
        true
    }

    /// Remove every product matching `id`. Returns `false` if nothing matched.
    pub fn apply_deleted(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| !r.matches(id));
        self.records.len() != before
    }

    /// Set one size's stock count on the matching product, leaving every
    /// other field untouched. Returns `false` if no product matched.
    pub fn apply_stock_changed(&mut self, id: &str, size: &str, new_count: i64) -> bool {
        let Some(record) = self.records.iter_mut().find(|r| r.matches(id)) else {
            return false;
        };
        record.sizes.insert(size.to_string(), new_count);
        true
    }

    /// Apply one push event. Returns whether the cache changed.
    pub fn apply_event(&mut self, event: &PushEvent) -> bool {
        let changed = match event {
            PushEvent::ProductCreated(record) => {
                self.apply_created(record.clone());
                true
            }
            PushEvent::ProductUpdated(record) => self.apply_updated(record.clone()),
            PushEvent::ProductDeleted(id) => self.apply_deleted(id.as_str()),
            PushEvent::StockUpdated {
                product_id,
                size,
                new_stock,
            } => self.apply_stock_changed(product_id.as_str(), size, *new_stock),
            PushEvent::OrderCreated(_) => false,
        };
        debug!(event = event.name(), changed, "Applied push event");
        changed
    }
}
