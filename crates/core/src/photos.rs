//! Filesystem-backed photo blob storage.
//!
//! The filesystem is the source of truth for photos: identity is the
//! generated filename, there is no database row. Names are prefixed with a
//! per-call timestamp and a 1-based sequence number, so two uploads in the
//! same call never collide; collisions across calls are only possible within
//! the same second at the same sequence number and are accepted as
//! last-write-wins.

use crate::paths::PhonePaths;
use crate::{PhoneKey, StorageError, StorageResult};
use chrono::Utc;
use std::fs;

/// Timestamp prefix for generated photo names, to the second.
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Longest accepted original-name extension, dot included.
const MAX_EXTENSION_LEN: usize = 6;

/// One uploaded file part, as handed over by the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
    pub original_name: Option<String>,
}

/// Persists and lists photo blobs under a record's photos directory.
pub struct PhotoStore {
    paths: PhonePaths,
}

impl PhotoStore {
    pub fn new(paths: PhonePaths) -> Self {
        Self { paths }
    }

    /// Writes uploaded photos under the key's photos directory.
    ///
    /// Precondition: the photos directory exists (the orchestrator creates
    /// it before delegating here). Parts with empty content are skipped and
    /// do not consume a sequence number. Writes are not transactional as a
    /// batch; a failure leaves earlier files of the same call in place.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedMediaType`] when a part's declared
    /// content type is absent or not `image/*`, [`StorageError::PathTraversal`]
    /// when the generated target escapes the photos directory and
    /// [`StorageError::Io`] on write failure.
    pub fn store(&self, key: &PhoneKey, files: &[UploadedPhoto]) -> StorageResult<()> {
        let stamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let mut sequence = 0usize;

        for file in files {
            if file.content.is_empty() {
                tracing::debug!(key = %key, "skipping empty upload part");
                continue;
            }

            let content_type = file
                .content_type
                .as_deref()
                .filter(|ct| ct.starts_with("image/"))
                .ok_or_else(|| StorageError::UnsupportedMediaType(file.content_type.clone()))?;

            sequence += 1;
            let file_name = format!(
                "{stamp}-{sequence}{ext}",
                ext = guess_extension(file.original_name.as_deref(), content_type)
            );

            // Generated names are re-validated like caller-supplied ones;
            // the declared original name feeds the extension.
            let target = self.paths.resolve_photo(key, &file_name)?;
            fs::write(&target, &file.content)?;

            tracing::debug!(key = %key, file = %file_name, bytes = file.content.len(), "photo stored");
        }

        Ok(())
    }

    /// Lists stored photo filenames for a key, lexicographically sorted.
    ///
    /// The timestamp prefix makes lexicographic order double as
    /// chronological order. A missing photos directory yields an empty list,
    /// not an error.
    pub fn list(&self, key: &PhoneKey) -> StorageResult<Vec<String>> {
        let photos_dir = self.paths.photos_dir(key);
        if !photos_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&photos_dir)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }

        names.sort();
        Ok(names)
    }
}

/// Picks a file extension for a stored photo.
///
/// Prefers the declared original name's suffix when it is short enough,
/// then falls back to a canonical extension for the declared image type.
fn guess_extension(original_name: Option<&str>, content_type: &str) -> String {
    if let Some(name) = original_name {
        if let Some(dot) = name.rfind('.') {
            let ext = &name[dot..];
            if ext.len() <= MAX_EXTENSION_LEN {
                return ext.to_owned();
            }
        }
    }

    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        _ => ".img",
    }
    .to_owned()
}
