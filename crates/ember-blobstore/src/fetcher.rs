//! Peer chunk-fetch collaborator: `spec.md` §4.3 "broadcast a
//! `request_image_chunks`... await chunks with a 10 s deadline; on timeout,
//! retry up to 3x with exponential backoff". The actual wire exchange is
//! owned by the networking layer; `ember-blobstore` only needs the promise
//! of an answer.

use async_trait::async_trait;

/// Implemented by the networking layer: broadcasts `request_image_chunks`
/// to connected peers and resolves once the requested chunks arrive (or the
/// caller's own timeout elapses).
#[async_trait]
pub trait ChunkFetcher: Send + Sync {
    /// `missing` is `(chunk_index, chunk_hash)` pairs. Returns whatever
    /// chunks arrived before the caller's own deadline, as
    /// `(chunk_index, bytes)`; a partial or empty result is not an error,
    /// just grounds for another attempt.
    async fn fetch_chunks(&self, image_hash: [u8; 32], missing: Vec<(u32, [u8; 32])>) -> Vec<(u32, Vec<u8>)>;
}

/// A fetcher with no peers; every request returns nothing. Useful for
/// single-node tests and for blobs the local node already holds in full.
pub struct NullFetcher;

#[async_trait]
impl ChunkFetcher for NullFetcher {
    async fn fetch_chunks(&self, _image_hash: [u8; 32], _missing: Vec<(u32, [u8; 32])>) -> Vec<(u32, Vec<u8>)> {
        Vec::new()
    }
}
