#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]
//! Content-addressed chunked blob store: `spec.md` §4.3. Splits data into
//! 16 KiB chunks, hashes each, rolls up a Merkle root, and fetches missing
//! chunks from peers through an injected `ChunkFetcher`.

pub mod blobstore;
pub mod error;
pub mod fetcher;
pub mod merkle;

pub use blobstore::{BlobStore, DEFAULT_SOFT_CAP_BYTES};
pub use error::BlobStoreError;
pub use fetcher::{ChunkFetcher, NullFetcher};
pub use merkle::merkle_root;
