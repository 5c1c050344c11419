//! Metadata record storage.
//!
//! Records are kept in a pluggable key-value entity backend with
//! find-by-key / save semantics. The production backend is an embedded sled
//! database; entities are encoded as JSON documents. Enumerated codes are
//! stored as their symbolic names and parsed back strictly, and the
//! service-flags sub-object is stored as a compact JSON string.

use crate::{PhoneKey, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use phonevault_types::{Currency, Finished, PhoneDetails, Services};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Stored entity for one phone key.
///
/// `created_at` is fixed at first upsert and never touched again;
/// `updated_at` is refreshed on every upsert. Records are never physically
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneRecord {
    pub phone_key: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub address: Option<String>,
    pub services_json: Option<String>,
    pub comment: Option<String>,
    pub visited: Option<bool>,
    pub rating: Option<u8>,
    pub finished: Option<String>,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PhoneRecord {
    fn new(key: &PhoneKey, created_at: DateTime<Utc>) -> Self {
        Self {
            phone_key: key.as_str().to_owned(),
            description: None,
            price: None,
            currency: None,
            address: None,
            services_json: None,
            comment: None,
            visited: None,
            rating: None,
            finished: None,
            source_url: None,
            created_at,
            updated_at: created_at,
        }
    }
}

/// A decoded record: caller-facing details plus lifecycle timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub details: PhoneDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Key-value entity backend for phone records.
///
/// Single-save atomicity is the backend's concern; the store layers no
/// additional locking on top.
pub trait RecordBackend: Send + Sync {
    fn find(&self, key: &PhoneKey) -> StorageResult<Option<PhoneRecord>>;
    fn save(&self, record: &PhoneRecord) -> StorageResult<()>;
}

/// Production backend over an embedded sled database.
pub struct SledRecordStore {
    db: sled::Db,
}

impl SledRecordStore {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let db = sled::open(path).map_err(backend_error)?;
        Ok(Self { db })
    }
}

impl RecordBackend for SledRecordStore {
    fn find(&self, key: &PhoneKey) -> StorageResult<Option<PhoneRecord>> {
        match self.db.get(key.as_str().as_bytes()).map_err(backend_error)? {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(backend_error)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn save(&self, record: &PhoneRecord) -> StorageResult<()> {
        let bytes = serde_json::to_vec(record).map_err(backend_error)?;
        self.db
            .insert(record.phone_key.as_bytes(), bytes)
            .map_err(backend_error)?;
        self.db.flush().map_err(backend_error)?;
        Ok(())
    }
}

fn backend_error(err: impl std::error::Error + Send + Sync + 'static) -> StorageError {
    StorageError::Backend(Box::new(err))
}

/// Upserts and reads structured metadata against the backend.
pub struct RecordStore {
    backend: Arc<dyn RecordBackend>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self { backend }
    }

    /// Reads and decodes the record for a key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEnumValue`] when a stored enumerated
    /// code is unrecognised and [`StorageError::Serialization`] when the
    /// stored service flags cannot be decoded.
    pub fn find(&self, key: &PhoneKey) -> StorageResult<Option<StoredRecord>> {
        let Some(record) = self.backend.find(key)? else {
            return Ok(None);
        };

        let details = PhoneDetails {
            description: record.description,
            price: record.price,
            currency: parse_code::<Currency>(record.currency.as_deref())?,
            address: record.address,
            services: decode_services(record.services_json.as_deref())?,
            comment: record.comment,
            visited: record.visited,
            rating: record.rating,
            finished: parse_code::<Finished>(record.finished.as_deref())?,
            source_url: record.source_url,
        };

        Ok(Some(StoredRecord {
            details,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }))
    }

    /// Creates or overwrites the record for a key.
    ///
    /// A new entity gets `created_at` set exactly once. Every provided
    /// scalar field is overwritten unconditionally; there is no
    /// partial-merge semantics. `updated_at` is refreshed on every call.
    pub fn upsert(&self, key: &PhoneKey, details: &PhoneDetails) -> StorageResult<PhoneRecord> {
        let now = Utc::now();
        let mut record = self
            .backend
            .find(key)?
            .unwrap_or_else(|| PhoneRecord::new(key, now));

        record.description = details.description.clone();
        record.price = details.price;
        record.currency = details.currency.map(|c| c.as_str().to_owned());
        record.address = details.address.clone();
        record.services_json = encode_services(details.services.as_ref())?;
        record.comment = details.comment.clone();
        record.visited = details.visited;
        record.rating = details.rating;
        record.finished = details.finished.map(|f| f.as_str().to_owned());
        record.source_url = details.source_url.clone();
        record.updated_at = now;

        self.backend.save(&record)?;
        Ok(record)
    }
}

fn encode_services(services: Option<&Services>) -> StorageResult<Option<String>> {
    services
        .map(serde_json::to_string)
        .transpose()
        .map_err(StorageError::Serialization)
}

fn decode_services(json: Option<&str>) -> StorageResult<Option<Services>> {
    json.filter(|s| !s.trim().is_empty())
        .map(serde_json::from_str)
        .transpose()
        .map_err(StorageError::Serialization)
}

fn parse_code<T: FromStr<Err = phonevault_types::InvalidEnumValue>>(
    stored: Option<&str>,
) -> StorageResult<Option<T>> {
    stored
        .filter(|s| !s.trim().is_empty())
        .map(T::from_str)
        .transpose()
        .map_err(StorageError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, RecordStore, Arc<SledRecordStore>) {
        let temp = TempDir::new().unwrap();
        let backend = Arc::new(SledRecordStore::open(&temp.path().join("records")).unwrap());
        (temp, RecordStore::new(backend.clone()), backend)
    }

    fn key() -> PhoneKey {
        PhoneKey::normalize("+12025550100").unwrap()
    }

    fn details(description: &str) -> PhoneDetails {
        PhoneDetails {
            description: Some(description.into()),
            price: Some(Decimal::new(9900, 2)),
            currency: Some(Currency::Usd),
            address: Some("downtown".into()),
            services: Some(Services {
                owc: Some(true),
                ana: Some(false),
            }),
            comment: Some("call first".into()),
            visited: Some(true),
            rating: Some(5),
            finished: Some(Finished::No),
            source_url: Some("https://example.com/ad/1".into()),
        }
    }

    #[test]
    fn upsert_then_find_round_trips_all_fields() {
        let (_temp, store, _) = store();
        let key = key();

        store.upsert(&key, &details("first")).unwrap();
        let stored = store.find(&key).unwrap().unwrap();

        assert_eq!(stored.details, details("first"));
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[test]
    fn find_returns_none_for_unknown_keys() {
        let (_temp, store, _) = store();
        assert!(store.find(&key()).unwrap().is_none());
    }

    #[test]
    fn second_upsert_preserves_created_at_and_advances_updated_at() {
        let (_temp, store, _) = store();
        let key = key();

        let first = store.upsert(&key, &details("first")).unwrap();
        let second = store.upsert(&key, &details("second")).unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);

        let stored = store.find(&key).unwrap().unwrap();
        assert_eq!(stored.details.description.as_deref(), Some("second"));
    }

    #[test]
    fn omitted_fields_are_overwritten_as_absent() {
        let (_temp, store, _) = store();
        let key = key();

        store.upsert(&key, &details("full")).unwrap();

        let mut sparse = details("sparse");
        sparse.price = None;
        sparse.currency = None;
        sparse.services = None;
        store.upsert(&key, &sparse).unwrap();

        let stored = store.find(&key).unwrap().unwrap();
        assert!(stored.details.price.is_none());
        assert!(stored.details.currency.is_none());
        assert!(stored.details.services.is_none());
    }

    #[test]
    fn enum_codes_are_stored_as_symbolic_names() {
        let (_temp, store, backend) = store();
        let key = key();

        store.upsert(&key, &details("first")).unwrap();

        let raw = backend.find(&key).unwrap().unwrap();
        assert_eq!(raw.currency.as_deref(), Some("USD"));
        assert_eq!(raw.finished.as_deref(), Some("NO"));
    }

    #[test]
    fn corrupted_enum_code_fails_strict_parsing() {
        let (_temp, store, backend) = store();
        let key = key();

        let mut record = store.upsert(&key, &details("first")).unwrap();
        record.currency = Some("DOUBLOONS".into());
        backend.save(&record).unwrap();

        assert!(matches!(
            store.find(&key),
            Err(StorageError::InvalidEnumValue(_))
        ));
    }

    #[test]
    fn corrupted_services_json_fails_decoding() {
        let (_temp, store, backend) = store();
        let key = key();

        let mut record = store.upsert(&key, &details("first")).unwrap();
        record.services_json = Some("{not json".into());
        backend.save(&record).unwrap();

        assert!(matches!(
            store.find(&key),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn records_survive_reopening_the_backend() {
        let temp = TempDir::new().unwrap();
        let db_dir = temp.path().join("records");
        let key = key();

        {
            let backend = Arc::new(SledRecordStore::open(&db_dir).unwrap());
            RecordStore::new(backend)
                .upsert(&key, &details("persisted"))
                .unwrap();
        }

        let backend = Arc::new(SledRecordStore::open(&db_dir).unwrap());
        let stored = RecordStore::new(backend).find(&key).unwrap().unwrap();
        assert_eq!(stored.details.description.as_deref(), Some("persisted"));
    }
}
