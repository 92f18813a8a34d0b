//! `spec.md` §7 error taxonomy: `IntegrityError`, `NotFound`, `QuotaExceeded`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("blob not found")]
    NotFound,

    #[error("integrity error: {0}")]
    IntegrityError(String),

    #[error("chunk fetch from peers timed out after {0} attempts")]
    FetchTimedOut(u32),

    #[error("storage backend error: {0}")]
    Storage(#[from] ember_storage::StorageError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
