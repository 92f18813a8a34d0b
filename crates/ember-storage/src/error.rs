//! Persistence errors: `spec.md` §6 "storage surface".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("key not found")]
    NotFound,

    #[error("malformed stored value: {0}")]
    Malformed(String),
}
