//! `spec.md` §7: `NotFound`, `QuotaExceeded` as they apply to the DHT.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DhtError {
    #[error("lookup returned only closer peers, no value")]
    NotFound,

    #[error("dht storage at capacity")]
    QuotaExceeded,

    #[error("storage backend error: {0}")]
    Storage(#[from] ember_storage::StorageError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
