//! Blob (chunked image) metadata: `spec.md` §3 "Blob", §4.3.

use crate::b64;
use serde::{Deserialize, Serialize};

pub const CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRef {
    #[serde(with = "b64::fixed32")]
    pub hash: [u8; 32],
    pub index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobMeta {
    #[serde(with = "b64::fixed32")]
    pub hash: [u8; 32],
    #[serde(with = "b64::fixed32")]
    pub merkle_root: [u8; 32],
    pub chunks: Vec<ChunkRef>,
    pub size: u64,
    pub created_ms: i64,
}
