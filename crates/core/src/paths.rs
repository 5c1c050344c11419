//! Per-key path resolution and traversal defence.
//!
//! Candidate photo paths are normalized to absolute form before the
//! containment check; a substring test on raw input is not sufficient
//! because `..` segments change prefix relationships after resolution.

use crate::config::{StorageConfig, PHOTOS_DIR_NAME};
use crate::{PhoneKey, StorageError, StorageResult};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Resolves record and photo locations under the phones root.
///
/// The root is canonicalized at construction (bootstrap guarantees it
/// exists), so descendant checks are not defeated by a symlinked prefix.
#[derive(Debug, Clone)]
pub struct PhonePaths {
    phones_root: PathBuf,
}

impl PhonePaths {
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the phones root cannot be
    /// canonicalized, e.g. when bootstrap has not run.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let phones_root = config.phones_root().canonicalize()?;
        Ok(Self { phones_root })
    }

    pub fn phones_root(&self) -> &Path {
        &self.phones_root
    }

    /// Directory holding everything stored for one key.
    pub fn record_dir(&self, key: &PhoneKey) -> PathBuf {
        self.phones_root.join(key.as_str())
    }

    /// Per-key subdirectory holding uploaded photos.
    pub fn photos_dir(&self, key: &PhoneKey) -> PathBuf {
        self.record_dir(key).join(PHOTOS_DIR_NAME)
    }

    /// Creates the photos directory for a key. Idempotent.
    pub fn ensure_photos_dir(&self, key: &PhoneKey) -> StorageResult<PathBuf> {
        let dir = self.photos_dir(key);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Resolves a candidate photo file path for a key.
    ///
    /// Joins the photos directory with `file_name`, normalizes `.`/`..`
    /// segments and requires the result to be a strict descendant of the
    /// photos directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversal`] when the normalized path
    /// escapes the photos directory. Treated as a security violation, never
    /// retried.
    pub fn resolve_photo(&self, key: &PhoneKey, file_name: &str) -> StorageResult<PathBuf> {
        let photos_dir = self.photos_dir(key);
        let resolved = normalize_lexically(&photos_dir.join(file_name));

        if resolved == photos_dir || !resolved.starts_with(&photos_dir) {
            return Err(StorageError::PathTraversal(resolved));
        }

        Ok(resolved)
    }
}

/// Resolves `.` and `..` segments without touching the filesystem, so the
/// check also covers paths that do not exist yet.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths() -> (TempDir, PhonePaths) {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::new(temp.path().join("data"));
        config.initialise().unwrap();
        let paths = PhonePaths::new(&config).unwrap();
        (temp, paths)
    }

    fn key(raw: &str) -> PhoneKey {
        PhoneKey::normalize(raw).unwrap()
    }

    #[test]
    fn new_fails_without_bootstrap() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::new(temp.path().join("missing"));
        assert!(matches!(
            PhonePaths::new(&config),
            Err(StorageError::Io(_))
        ));
    }

    #[test]
    fn record_and_photo_dirs_nest_under_the_key() {
        let (_temp, paths) = paths();
        let key = key("+12025550100");

        assert_eq!(
            paths.record_dir(&key),
            paths.phones_root().join("+12025550100")
        );
        assert_eq!(
            paths.photos_dir(&key),
            paths.phones_root().join("+12025550100").join("photos")
        );
    }

    #[test]
    fn ensure_photos_dir_is_idempotent() {
        let (_temp, paths) = paths();
        let key = key("40721");

        let first = paths.ensure_photos_dir(&key).unwrap();
        let second = paths.ensure_photos_dir(&key).unwrap();

        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn resolve_photo_accepts_plain_file_names() {
        let (_temp, paths) = paths();
        let key = key("40721");

        let resolved = paths.resolve_photo(&key, "20240101-120000-1.png").unwrap();
        assert_eq!(
            resolved,
            paths.photos_dir(&key).join("20240101-120000-1.png")
        );
    }

    #[test]
    fn resolve_photo_rejects_parent_traversal() {
        let (_temp, paths) = paths();
        for raw in ["+12025550100", "40721", "373"] {
            let key = key(raw);
            assert!(matches!(
                paths.resolve_photo(&key, "../../etc/passwd"),
                Err(StorageError::PathTraversal(_))
            ));
        }
    }

    #[test]
    fn resolve_photo_rejects_absolute_injection() {
        let (_temp, paths) = paths();
        assert!(matches!(
            paths.resolve_photo(&key("40721"), "/etc/passwd"),
            Err(StorageError::PathTraversal(_))
        ));
    }

    #[test]
    fn resolve_photo_rejects_the_directory_itself() {
        let (_temp, paths) = paths();
        assert!(matches!(
            paths.resolve_photo(&key("40721"), "."),
            Err(StorageError::PathTraversal(_))
        ));
    }

    #[test]
    fn resolve_photo_rejects_traversal_that_returns_inside() {
        // Leaves the photos directory and comes back; the normalized result
        // is a descendant, but of another key's tree.
        let (_temp, paths) = paths();
        let result = paths.resolve_photo(&key("40721"), "../../999/photos/x.png");
        assert!(matches!(result, Err(StorageError::PathTraversal(_))));
    }
}
