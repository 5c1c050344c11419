//! Storage core for the PhoneVault phone record system.
//!
//! This crate turns untrusted external input — a raw phone string and
//! uploaded filenames — into a safe, collision-resistant storage key and
//! safe on-disk paths, and composes two independently failable stores under
//! that key:
//!
//! - a filesystem-backed photo blob store (`<phones_root>/<key>/photos/`)
//! - a key-value metadata store behind the pluggable [`RecordBackend`] trait
//!
//! There is no cross-store transaction; the orchestrator documents its
//! best-effort, non-atomic composition. Filesystem and metadata state for a
//! key may diverge after a partial failure, with no automatic
//! reconciliation.
//!
//! **No API concerns**: authentication, HTTP servers and multipart parsing
//! belong in `api-rest`.

pub mod config;
pub mod error;
pub mod key;
pub mod paths;
pub mod photos;
pub mod records;
pub mod service;

pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use key::PhoneKey;
pub use paths::PhonePaths;
pub use photos::{PhotoStore, UploadedPhoto};
pub use records::{PhoneRecord, RecordBackend, RecordStore, SledRecordStore, StoredRecord};
pub use service::{PhoneRecordView, PhoneStorageService, PhotoRef};
