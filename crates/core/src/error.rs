use std::path::PathBuf;

/// Failures surfaced by the storage core.
///
/// Every variant is propagated to the caller as a distinct failure; the core
/// performs no automatic retries. Input errors are not transient and storage
/// faults need operator attention.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid phone input: {0}")]
    InvalidKey(String),
    #[error("resolved path escapes the photos directory: {}", .0.display())]
    PathTraversal(PathBuf),
    #[error("only image uploads are allowed, got content type {0:?}")]
    UnsupportedMediaType(Option<String>),
    #[error("failed to encode/decode service flags: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error(transparent)]
    InvalidEnumValue(#[from] phonevault_types::InvalidEnumValue),
    #[error("metadata backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
