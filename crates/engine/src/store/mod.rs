//! Durable local store.
//!
//! Key-value persistence for the cart, the wishlist, and the session identity,
//! surviving process restarts. Values are JSON strings. Every key is written
//! independently and an absent key is a valid state.
//!
//! Reads never fail from the caller's point of view: [`load_json`] turns I/O
//! errors and unparsable data into `None` so a corrupt file degrades to an
//! empty cart instead of a crash.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

/// Errors raised by a local store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Logical keys of the persisted session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// The [`SessionIdentity`](storefront_sync_core::SessionIdentity).
    User,
    /// The cart lines.
    Cart,
    /// The wishlist product ids.
    Wishlist,
}

impl StoreKey {
    /// The key as written to the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronous key-value persistence.
///
/// Implementations apply their own namespace to `key`. Calls never suspend;
/// the session invokes them directly from mutation paths.
pub trait LocalStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot persist the value.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Read the value under `key`. `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete the value under `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot delete the value.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Physical key for `key` inside `namespace`.
#[must_use]
pub fn namespaced(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}

/// Load and decode a JSON value, degrading every failure to `None`.
pub fn load_json<T>(store: &dyn LocalStore, key: StoreKey) -> Option<T>
where
    T: DeserializeOwned,
{
    let raw = match store.load(key.as_str()) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read local store, treating as absent");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding unparsable local store value");
            None
        }
    }
}

/// Encode a value as JSON and write it.
///
/// # Errors
///
/// Returns `StoreError` if encoding or the backend write fails.
pub fn save_json<T>(store: &dyn LocalStore, key: StoreKey, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.save(key.as_str(), &raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storefront_sync_core::CartLine;

    use super::*;

    #[test]
    fn test_round_trip_through_helpers() {
        let store = MemoryStore::new("test");
        let lines = vec![CartLine::new("p1", "M", 2)];

        save_json(&store, StoreKey::Cart, &lines).unwrap();
        let loaded: Vec<CartLine> = load_json(&store, StoreKey::Cart).unwrap();
        assert_eq!(loaded, lines);
    }

    #[test]
    fn test_absent_key_is_none() {
        let store = MemoryStore::new("test");
        assert!(load_json::<Vec<CartLine>>(&store, StoreKey::Cart).is_none());
    }

    #[test]
    fn test_corrupt_value_degrades_to_none() {
        let store = MemoryStore::new("test");
        store.save("cart", "{not json").unwrap();
        assert!(load_json::<Vec<CartLine>>(&store, StoreKey::Cart).is_none());

        store.save("cart", r#"{"productId": 7}"#).unwrap();
        assert!(load_json::<Vec<CartLine>>(&store, StoreKey::Cart).is_none());
    }

    #[test]
    fn test_namespaced_key() {
        assert_eq!(namespaced("storefront", "cart"), "storefront:cart");
    }
}
