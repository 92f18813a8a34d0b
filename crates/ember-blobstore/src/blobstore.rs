//! `spec.md` §4.3 the content-addressed chunked blob store: `store`,
//! `retrieve` (with in-flight coalescing and peer-fetch of missing chunks),
//! and capacity eviction.

use crate::error::BlobStoreError;
use crate::fetcher::ChunkFetcher;
use crate::merkle::merkle_root;
use dashmap::DashMap;
use ember_crypto::{sha256, sha256_concat};
use ember_storage::keyspace::IMAGE_CHUNKS;
use ember_storage::KVStore;
use ember_types::blob::{BlobMeta, ChunkRef, CHUNK_SIZE};
use ember_types::time::now_ms;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// `spec.md` §6: "Capacity: soft cap 10 MiB of chunk bytes".
pub const DEFAULT_SOFT_CAP_BYTES: u64 = 10 * 1024 * 1024;
/// Evict down to this fraction of the cap once it's exceeded.
const EVICT_TO_FRACTION: f64 = 0.70;
const FETCH_DEADLINE: Duration = Duration::from_secs(10);
const MAX_FETCH_ATTEMPTS: u32 = 3;

fn meta_key(hash: &[u8; 32]) -> Vec<u8> {
    let mut k = b"meta/".to_vec();
    k.extend_from_slice(hash);
    k
}

fn chunk_key(chunk_hash: &[u8; 32]) -> Vec<u8> {
    let mut k = b"chunk/".to_vec();
    k.extend_from_slice(chunk_hash);
    k
}

pub struct BlobStore {
    store: Arc<dyn KVStore>,
    fetcher: Arc<dyn ChunkFetcher>,
    soft_cap_bytes: u64,
    inflight: DashMap<[u8; 32], Arc<Notify>>,
    usage_bytes: AtomicU64,
}

impl BlobStore {
    pub fn new(store: Arc<dyn KVStore>, fetcher: Arc<dyn ChunkFetcher>) -> Self {
        Self {
            store,
            fetcher,
            soft_cap_bytes: DEFAULT_SOFT_CAP_BYTES,
            inflight: DashMap::new(),
            usage_bytes: AtomicU64::new(0),
        }
    }

    pub fn with_soft_cap(mut self, cap: u64) -> Self {
        self.soft_cap_bytes = cap;
        self
    }

    /// `spec.md` §4.3 `store(bytes) -> {hash, merkle_root, chunk_count}`.
    pub async fn store(&self, bytes: &[u8]) -> Result<BlobMeta, BlobStoreError> {
        let hash = sha256_concat(&bytes.chunks(CHUNK_SIZE).map(|c| c.to_vec()).collect::<Vec<_>>());
        let mut chunk_hashes = Vec::new();
        let mut chunk_refs = Vec::new();
        for (index, chunk) in bytes.chunks(CHUNK_SIZE).enumerate() {
            let chunk_hash = sha256(chunk);
            self.store
                .put(IMAGE_CHUNKS, &chunk_key(&chunk_hash), chunk)
                .await?;
            chunk_hashes.push(chunk_hash);
            chunk_refs.push(ChunkRef {
                hash: chunk_hash,
                index: index as u32,
            });
        }
        let merkle_root = merkle_root(&chunk_hashes);
        let meta = BlobMeta {
            hash,
            merkle_root,
            chunks: chunk_refs,
            size: bytes.len() as u64,
            created_ms: now_ms(),
        };
        let encoded = serde_json::to_vec(&meta)?;
        self.store.put(IMAGE_CHUNKS, &meta_key(&hash), &encoded).await?;

        self.usage_bytes.fetch_add(meta.size, Ordering::SeqCst);
        self.evict_if_needed().await?;
        Ok(meta)
    }

    /// `spec.md` §4.3 `retrieve(hash) -> bytes | not_found | integrity_error`.
    /// Concurrent calls for the same `hash` coalesce onto one retrieval.
    pub async fn retrieve(&self, hash: [u8; 32]) -> Result<Vec<u8>, BlobStoreError> {
        loop {
            if let Some(notify) = self.inflight.get(&hash).map(|e| e.clone()) {
                notify.notified().await;
                continue;
            }
            let notify = Arc::new(Notify::new());
            if self.inflight.insert(hash, notify.clone()).is_some() {
                continue;
            }
            let result = self.retrieve_uncoalesced(hash).await;
            self.inflight.remove(&hash);
            notify.notify_waiters();
            return result;
        }
    }

    async fn retrieve_uncoalesced(&self, hash: [u8; 32]) -> Result<Vec<u8>, BlobStoreError> {
        let raw_meta = self
            .store
            .get(IMAGE_CHUNKS, &meta_key(&hash))
            .await?
            .ok_or(BlobStoreError::NotFound)?;
        let meta: BlobMeta = serde_json::from_slice(&raw_meta)?;

        let mut have: Vec<Option<Vec<u8>>> = vec![None; meta.chunks.len()];
        for chunk_ref in &meta.chunks {
            let idx = chunk_ref.index as usize;
            if let Some(slot) = have.get_mut(idx) {
                *slot = self.store.get(IMAGE_CHUNKS, &chunk_key(&chunk_ref.hash)).await?;
            }
        }

        let mut attempt = 0u32;
        while have.iter().any(Option::is_none) {
            let missing: Vec<(u32, [u8; 32])> = meta
                .chunks
                .iter()
                .filter(|c| have.get(c.index as usize).map(Option::is_none).unwrap_or(false))
                .map(|c| (c.index, c.hash))
                .collect();
            if missing.is_empty() {
                break;
            }
            if attempt >= MAX_FETCH_ATTEMPTS {
                return Err(BlobStoreError::FetchTimedOut(attempt));
            }
            debug!(attempt, missing = missing.len(), "requesting missing blob chunks from peers");
            let fetched = tokio::time::timeout(FETCH_DEADLINE, self.fetcher.fetch_chunks(hash, missing))
                .await
                .unwrap_or_default();
            for (index, data) in fetched {
                let chunk_hash = sha256(&data);
                let expected = meta.chunks.iter().find(|c| c.index == index).map(|c| c.hash);
                if expected != Some(chunk_hash) {
                    warn!(index, "peer returned chunk with mismatched hash, discarding");
                    continue;
                }
                self.store.put(IMAGE_CHUNKS, &chunk_key(&chunk_hash), &data).await?;
                if let Some(slot) = have.get_mut(index as usize) {
                    *slot = Some(data);
                }
            }
            attempt += 1;
            if have.iter().any(Option::is_none) {
                tokio::time::sleep(Duration::from_millis(500 * 2u64.pow(attempt - 1))).await;
            }
        }

        let chunks: Vec<Vec<u8>> = have
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(BlobStoreError::FetchTimedOut(MAX_FETCH_ATTEMPTS))?;
        let ordered: Vec<u8> = chunks.concat();

        let recomputed_hash = sha256_concat(&chunks);
        if recomputed_hash != hash {
            return Err(BlobStoreError::IntegrityError("chunk concatenation hash mismatch".into()));
        }
        let recomputed_root = merkle_root(&meta.chunks.iter().map(|c| c.hash).collect::<Vec<_>>());
        if recomputed_root != meta.merkle_root {
            return Err(BlobStoreError::IntegrityError("merkle root mismatch".into()));
        }

        Ok(ordered)
    }

    /// `spec.md` §6: "on store, if projected usage exceeds cap, evict oldest
    /// images (by created) until usage <= 70% cap, deleting only chunks no
    /// longer referenced by any remaining image."
    async fn evict_if_needed(&self) -> Result<(), BlobStoreError> {
        if self.usage_bytes.load(Ordering::SeqCst) <= self.soft_cap_bytes {
            return Ok(());
        }
        let target = (self.soft_cap_bytes as f64 * EVICT_TO_FRACTION) as u64;
        let metas_raw = self.store.iterate_prefix(IMAGE_CHUNKS, b"meta/").await?;
        let mut metas: Vec<BlobMeta> = metas_raw
            .iter()
            .filter_map(|(_, v)| serde_json::from_slice(v).ok())
            .collect();
        metas.sort_by_key(|m| m.created_ms);

        let mut usage = self.usage_bytes.load(Ordering::SeqCst);
        for meta in &metas {
            if usage <= target {
                break;
            }
            self.store.delete(IMAGE_CHUNKS, &meta_key(&meta.hash)).await?;
            for chunk_ref in &meta.chunks {
                if !self.chunk_referenced_elsewhere(&metas, &meta.hash, chunk_ref.hash) {
                    self.store.delete(IMAGE_CHUNKS, &chunk_key(&chunk_ref.hash)).await?;
                }
            }
            usage = usage.saturating_sub(meta.size);
        }
        self.usage_bytes.store(usage, Ordering::SeqCst);
        Ok(())
    }

    fn chunk_referenced_elsewhere(&self, metas: &[BlobMeta], excluding_hash: &[u8; 32], chunk_hash: [u8; 32]) -> bool {
        metas
            .iter()
            .filter(|m| &m.hash != excluding_hash)
            .any(|m| m.chunks.iter().any(|c| c.hash == chunk_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::NullFetcher;
    use ember_storage::MemStore;

    fn store_with_cap(cap: u64) -> BlobStore {
        BlobStore::new(Arc::new(MemStore::new()), Arc::new(NullFetcher)).with_soft_cap(cap)
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips() {
        let bs = store_with_cap(DEFAULT_SOFT_CAP_BYTES);
        let data = vec![7u8; CHUNK_SIZE * 3 + 100];
        let meta = bs.store(&data).await.unwrap();
        assert_eq!(meta.chunks.len(), 4);
        let retrieved = bs.retrieve(meta.hash).await.unwrap();
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn retrieve_unknown_hash_fails() {
        let bs = store_with_cap(DEFAULT_SOFT_CAP_BYTES);
        let err = bs.retrieve([9u8; 32]).await;
        assert!(matches!(err, Err(BlobStoreError::NotFound)));
    }

    #[tokio::test]
    async fn missing_chunks_with_no_peers_times_out() {
        let bs = store_with_cap(DEFAULT_SOFT_CAP_BYTES);
        let data = vec![1u8; CHUNK_SIZE * 2];
        let meta = bs.store(&data).await.unwrap();
        bs.store
            .delete(IMAGE_CHUNKS, &chunk_key(&meta.chunks[0].hash))
            .await
            .unwrap();
        let err = bs.retrieve(meta.hash).await;
        assert!(matches!(err, Err(BlobStoreError::FetchTimedOut(_))));
    }

    #[tokio::test]
    async fn eviction_keeps_usage_under_cap() {
        let bs = store_with_cap(CHUNK_SIZE as u64 * 2);
        let a = bs.store(&vec![1u8; CHUNK_SIZE]).await.unwrap();
        let _b = bs.store(&vec![2u8; CHUNK_SIZE]).await.unwrap();
        let _c = bs.store(&vec![3u8; CHUNK_SIZE]).await.unwrap();
        assert!(bs.retrieve(a.hash).await.is_err());
    }
}
