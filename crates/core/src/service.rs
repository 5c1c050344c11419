//! Orchestration of the photo store and the record store.
//!
//! The two stores are independently failable and share nothing but the
//! normalized key; there is no cross-store transaction. An upsert writes
//! photos first and metadata second: a photo failure stops the call before
//! metadata runs, while a metadata failure after photos were written leaves
//! the photos in place. This best-effort composition is accepted by design.

use crate::paths::PhonePaths;
use crate::photos::{PhotoStore, UploadedPhoto};
use crate::records::{RecordBackend, RecordStore};
use crate::{PhoneKey, StorageResult};
use chrono::{DateTime, Utc};
use phonevault_types::PhoneDetails;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use utoipa::ToSchema;

/// Reference to one stored photo: its filename and its retrieval path.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhotoRef {
    pub file_name: String,
    pub url: String,
}

/// Merged read-only projection of metadata and photos for one key.
///
/// Computed on demand; never persisted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhoneRecordView {
    pub phone: String,
    pub info: Option<PhoneDetails>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub photos: Vec<PhotoRef>,
}

/// Single read/write view over the hybrid store, keyed by raw phone input.
///
/// This is the component the HTTP layer invokes.
pub struct PhoneStorageService {
    paths: PhonePaths,
    photos: PhotoStore,
    records: RecordStore,
}

impl PhoneStorageService {
    pub fn new(paths: PhonePaths, backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            photos: PhotoStore::new(paths.clone()),
            records: RecordStore::new(backend),
            paths,
        }
    }

    /// Returns the merged view for a raw phone input.
    ///
    /// A key with no stored metadata or photos yields an empty view, not an
    /// error.
    pub fn get(&self, raw_phone: &str) -> StorageResult<PhoneRecordView> {
        let key = PhoneKey::normalize(raw_phone)?;
        self.view(&key)
    }

    /// Applies metadata and/or photo uploads for a raw phone input.
    ///
    /// Ensures the photos directory, then writes photos (when supplied),
    /// then metadata (when supplied). Returns a fresh read of the key so the
    /// response reflects the merged on-disk and on-record truth rather than
    /// an in-memory snapshot of the just-applied changes.
    pub fn upsert(
        &self,
        raw_phone: &str,
        info: Option<&PhoneDetails>,
        photos: &[UploadedPhoto],
    ) -> StorageResult<PhoneRecordView> {
        let key = PhoneKey::normalize(raw_phone)?;

        self.paths.ensure_photos_dir(&key)?;
        if !photos.is_empty() {
            self.photos.store(&key, photos)?;
        }

        if let Some(info) = info {
            self.records.upsert(&key, info)?;
            tracing::info!(key = %key, photos = photos.len(), "record upserted");
        } else {
            tracing::info!(key = %key, photos = photos.len(), "photos stored without metadata");
        }

        self.view(&key)
    }

    /// Resolves the on-disk path for a stored photo.
    ///
    /// The caller is responsible for checking existence and serving the
    /// file; a missing file is a not-found condition, not an error here.
    pub fn resolve_photo(&self, raw_phone: &str, file_name: &str) -> StorageResult<PathBuf> {
        let key = PhoneKey::normalize(raw_phone)?;
        self.paths.resolve_photo(&key, file_name)
    }

    fn view(&self, key: &PhoneKey) -> StorageResult<PhoneRecordView> {
        let stored = self.records.find(key)?;
        let photos = self
            .photos
            .list(key)?
            .into_iter()
            .map(|file_name| PhotoRef {
                url: format!("/records/{key}/photos/{file_name}"),
                file_name,
            })
            .collect();

        let (info, created_at, updated_at) = match stored {
            Some(record) => (
                Some(record.details),
                Some(record.created_at),
                Some(record.updated_at),
            ),
            None => (None, None, None),
        };

        Ok(PhoneRecordView {
            phone: key.as_str().to_owned(),
            info,
            created_at,
            updated_at,
            photos,
        })
    }
}
