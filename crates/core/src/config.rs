//! Storage configuration and bootstrap.
//!
//! Configuration is resolved once at process startup and passed by reference
//! into the services that need it. Request handling never reads ambient
//! process state, which keeps behaviour consistent across multi-threaded
//! runtimes and test harnesses.

use crate::StorageResult;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the storage base holding one subtree per phone key.
pub const PHONES_DIR_NAME: &str = "phones";
/// Directory under the storage base holding the metadata store.
pub const RECORDS_DIR_NAME: &str = "records";
/// Per-key subdirectory holding uploaded image blobs.
pub const PHOTOS_DIR_NAME: &str = "photos";

/// Storage layout rooted at a single base directory.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    base_path: PathBuf,
}

impl StorageConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Root of the per-key photo tree.
    pub fn phones_root(&self) -> PathBuf {
        self.base_path.join(PHONES_DIR_NAME)
    }

    /// Location of the embedded metadata store.
    pub fn records_db_dir(&self) -> PathBuf {
        self.base_path.join(RECORDS_DIR_NAME)
    }

    /// Creates the storage base and the phones subtree.
    ///
    /// Idempotent; must run before any storage service is constructed so the
    /// path resolver can canonicalize an existing root.
    pub fn initialise(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path)?;
        fs::create_dir_all(self.phones_root())?;

        tracing::info!(base_path = %self.base_path.display(), "storage initialised");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn initialise_creates_phones_subtree() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::new(temp.path().join("data"));

        config.initialise().unwrap();

        assert!(config.base_path().is_dir());
        assert!(config.phones_root().is_dir());
    }

    #[test]
    fn initialise_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::new(temp.path().join("data"));

        config.initialise().unwrap();
        config.initialise().unwrap();

        assert!(config.phones_root().is_dir());
    }

    #[test]
    fn layout_is_rooted_at_the_base_path() {
        let config = StorageConfig::new("/srv/phonevault");
        assert_eq!(
            config.phones_root(),
            PathBuf::from("/srv/phonevault/phones")
        );
        assert_eq!(
            config.records_db_dir(),
            PathBuf::from("/srv/phonevault/records")
        );
    }
}
