//! `spec.md` §7 error kinds as they surface at the node boundary. Every
//! crate-local error implements `std::error::Error`, so callers outside this
//! crate mostly interact through `anyhow::Error`; this enum exists for the
//! handful of cases the CLI needs to match on directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("identity error: {0}")]
    Identity(#[from] ember_identity::IdentityError),

    #[error("post error: {0}")]
    Post(#[from] ember_post::PostError),

    #[error("dht error: {0}")]
    Dht(#[from] ember_dht::DhtError),

    #[error("blob store error: {0}")]
    BlobStore(#[from] ember_blobstore::BlobStoreError),

    #[error("storage error: {0}")]
    Storage(#[from] ember_storage::StorageError),

    #[error("network error: {0}")]
    Net(#[from] ember_net::NetError),

    #[error("handle {0} is not yet resolvable")]
    UnknownHandle(String),

    #[error("this node has no local identity yet; run `ember-node identity claim` first")]
    NoLocalIdentity,
}
