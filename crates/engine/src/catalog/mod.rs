//! Catalog cache.
//!
//! In-memory product records, seeded by one bulk fetch and then kept live by
//! push-channel events. Events are applied in arrival order; no batching,
//! reordering, or deduplication happens here.

mod cache;
mod placeholder;

pub use cache::CatalogCache;
pub use placeholder::{PLACEHOLDER_PRODUCT_ID, placeholder_catalog};

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use storefront_sync_core::ProductRecord;
use tracing::{info, instrument, warn};

use crate::error::report;
use crate::remote::RemoteError;

/// The catalog fetch service.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every product.
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, RemoteError>;
}

/// Bulk-load `cache` from `source`.
///
/// A failed or empty fetch installs the diagnostic placeholder set instead,
/// so the storefront never shows an empty catalog because of a transient
/// network problem. Returns the number of records now cached.
#[instrument(skip_all)]
pub async fn load_catalog(source: &dyn CatalogSource, cache: &RwLock<CatalogCache>) -> usize {
    let records = match source.fetch_products().await {
        Ok(records) if records.is_empty() => {
            warn!("Catalog fetch returned no products, using placeholder");
            Vec::new()
        }
        Ok(records) => records,
        Err(e) => {
            report("catalog fetch", &e);
            Vec::new()
        }
    };

    let mut cache = cache.write().unwrap_or_else(PoisonError::into_inner);
    cache.bulk_load(records);
    info!(
        count = cache.len(),
        placeholder = cache.is_placeholder(),
        "Catalog loaded"
    );
    cache.len()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct FixedSource(Result<Vec<ProductRecord>, u16>);

    #[async_trait]
    impl CatalogSource for FixedSource {
        async fn fetch_products(&self) -> Result<Vec<ProductRecord>, RemoteError> {
            self.0.clone().map_err(|status| RemoteError::Api {
                status,
                message: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_successful_fetch_replaces_cache() {
        let cache = RwLock::new(CatalogCache::new());
        let source = FixedSource(Ok(vec![ProductRecord::new("p1", "SKU-1", "Tee")]));

        assert_eq!(load_catalog(&source, &cache).await, 1);
        let cache = cache.read().unwrap();
        assert!(!cache.is_placeholder());
        assert!(cache.get("p1").is_some());
    }

    #[tokio::test]
    async fn test_failed_fetch_falls_back_to_placeholder() {
        let cache = RwLock::new(CatalogCache::new());
        load_catalog(&FixedSource(Err(502)), &cache).await;

        let cache = cache.read().unwrap();
        assert!(cache.is_placeholder());
        assert!(cache.get(PLACEHOLDER_PRODUCT_ID).is_some());
    }

    #[tokio::test]
    async fn test_empty_fetch_falls_back_to_placeholder() {
        let cache = RwLock::new(CatalogCache::new());
        load_catalog(&FixedSource(Ok(Vec::new())), &cache).await;
        assert!(cache.read().unwrap().is_placeholder());
    }
}
