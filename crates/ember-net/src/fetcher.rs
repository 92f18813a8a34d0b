//! The concrete `ember_blobstore::ChunkFetcher`: broadcasts
//! `request_image_chunks` and collects `image_chunk` replies as they arrive.
//! `spec.md` §4.3, §6.

use crate::peer_table::PeerTable;
use dashmap::DashMap;
use ember_blobstore::ChunkFetcher;
use ember_types::wire::WireMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// In-flight chunk requests, keyed by `request_id`. The main loop's inbound
/// dispatch calls [`ChunkRequestTable::deliver`] for every `image_chunk`
/// frame carrying a known `request_id`.
#[derive(Clone, Default)]
pub struct ChunkRequestTable {
    inner: Arc<DashMap<String, mpsc::Sender<([u8; 32], Vec<u8>)>>>,
}

impl ChunkRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, request_id: String) -> mpsc::Receiver<([u8; 32], Vec<u8>)> {
        let (tx, rx) = mpsc::channel(64);
        self.inner.insert(request_id, tx);
        rx
    }

    pub async fn deliver(&self, request_id: &str, chunk_hash: [u8; 32], data: Vec<u8>) {
        if let Some(tx) = self.inner.get(request_id).map(|e| e.clone()) {
            let _ = tx.send((chunk_hash, data)).await;
        } else {
            debug!(request_id, "image chunk reply for unknown request, dropping");
        }
    }

    fn cancel(&self, request_id: &str) {
        self.inner.remove(request_id);
    }
}

pub struct NetChunkFetcher {
    peers: PeerTable,
    requests: ChunkRequestTable,
}

impl NetChunkFetcher {
    pub fn new(peers: PeerTable, requests: ChunkRequestTable) -> Self {
        Self { peers, requests }
    }
}

#[async_trait::async_trait]
impl ChunkFetcher for NetChunkFetcher {
    async fn fetch_chunks(&self, image_hash: [u8; 32], missing: Vec<(u32, [u8; 32])>) -> Vec<(u32, Vec<u8>)> {
        if missing.is_empty() {
            return Vec::new();
        }
        let request_id = uuid::Uuid::new_v4().to_string();
        let hash_to_index: HashMap<[u8; 32], u32> = missing.iter().map(|(i, h)| (*h, *i)).collect();
        let chunk_hashes: Vec<[u8; 32]> = missing.iter().map(|(_, h)| *h).collect();

        let mut rx = self.requests.register(request_id.clone());
        self.peers
            .broadcast(WireMessage::RequestImageChunks {
                image_hash,
                chunk_hashes,
                request_id: request_id.clone(),
            })
            .await;

        let mut collected = Vec::new();
        while collected.len() < hash_to_index.len() {
            match rx.recv().await {
                Some((hash, data)) => {
                    if let Some(index) = hash_to_index.get(&hash) {
                        collected.push((*index, data));
                    }
                }
                None => break,
            }
        }
        self.requests.cancel(&request_id);
        collected
    }
}
