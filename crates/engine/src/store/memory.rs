//! In-memory local store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{LocalStore, StoreError, namespaced};

/// A [`LocalStore`] backed by a `HashMap`.
///
/// Lives as long as the process. Used in tests and for ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespace: String,
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Physical keys currently present, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl LocalStore for MemoryStore {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespaced(&self.namespace, key), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&namespaced(&self.namespace, key))
            .cloned())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&namespaced(&self.namespace, key));
        Ok(())
    }
}
