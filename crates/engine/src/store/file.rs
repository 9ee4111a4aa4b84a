//! File-backed local store.
//!
//! One JSON file per namespaced key inside a directory. Writes go to a
//! temporary sibling first and are renamed into place, so a crash mid-write
//! leaves either the old value or the new one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use tracing::debug;

use super::{LocalStore, StoreError, namespaced};

/// A [`LocalStore`] persisting each key to `<dir>/<namespace>.<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    namespace: String,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            namespace: namespace.into(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // ':' is not portable in file names.
        let file_name = namespaced(&self.namespace, key).replace(':', ".");
        self.dir.join(format!("{file_name}.json"))
    }
}

impl LocalStore for FileStore {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "Wrote local store value");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
