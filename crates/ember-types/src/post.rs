//! Post, attestation, and rating data model: `spec.md` §3 "Post",
//! "Attestation", "Rating".

use crate::b64;
use crate::blob::BlobMeta;
use crate::vdfproof::VdfProof;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MAX_DEPTH: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    #[serde(with = "b64::fixed16")]
    pub id: [u8; 16],
    pub author: String,
    #[serde(with = "b64::bytes")]
    pub author_pk: Vec<u8>,
    pub timestamp: i64,
    #[serde(with = "b64::opt_fixed16")]
    pub parent_id: Option<[u8; 16]>,
    pub content: String,
    #[serde(with = "b64::opt_fixed32")]
    pub image_hash: Option<[u8; 32]>,
    pub image_meta: Option<BlobMeta>,
    #[serde(with = "b64::bytes")]
    pub vdf_input: Vec<u8>,
    pub vdf_proof: VdfProof,
    #[serde(with = "b64::bytes")]
    pub author_vdf_input: Vec<u8>,
    pub author_vdf_proof: VdfProof,
    #[serde(with = "b64::bytes")]
    pub signature: Vec<u8>,
    pub carriers: BTreeSet<String>,
    pub replies: BTreeSet<[u8; 16]>,
    pub depth: u32,
    pub trust_score: f64,
    pub attesters: BTreeSet<String>,
    pub explicitly_carrying: bool,
}

/// Signed fields for a post: `{id, content, timestamp, parent_id, image_hash,
/// author_pk (b64)}`, field order significant.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalPost<'a> {
    #[serde(with = "b64::fixed16")]
    pub id: [u8; 16],
    pub content: &'a str,
    pub timestamp: i64,
    #[serde(with = "b64::opt_fixed16")]
    pub parent_id: Option<[u8; 16]>,
    #[serde(with = "b64::opt_fixed32")]
    pub image_hash: Option<[u8; 32]>,
    #[serde(with = "b64::bytes")]
    pub author_pk: &'a [u8],
}

impl Post {
    pub fn canonical(&self) -> CanonicalPost<'_> {
        CanonicalPost {
            id: self.id,
            content: &self.content,
            timestamp: self.timestamp,
            parent_id: self.parent_id,
            image_hash: self.image_hash,
            author_pk: &self.author_pk,
        }
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.canonical()).unwrap_or_default()
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_alive(&self) -> bool {
        !self.carriers.is_empty()
    }

    pub fn depth_for(parent_depth: Option<u32>) -> u32 {
        match parent_depth {
            None => 0,
            Some(d) => (d + 1).min(MAX_DEPTH),
        }
    }
}

/// `spec.md` §3 "Attestation". Signature binds the first four fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    #[serde(with = "b64::fixed16")]
    pub post_id: [u8; 16],
    pub post_author: String,
    pub timestamp: i64,
    pub vdf_iterations: u64,
    pub attester_handle: String,
    #[serde(with = "b64::bytes")]
    pub attester_pk: Vec<u8>,
    #[serde(with = "b64::bytes")]
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanonicalAttestation<'a> {
    #[serde(with = "b64::fixed16")]
    pub post_id: [u8; 16],
    pub post_author: &'a str,
    pub timestamp: i64,
    pub vdf_iterations: u64,
}

impl Attestation {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let canonical = CanonicalAttestation {
            post_id: self.post_id,
            post_author: &self.post_author,
            timestamp: self.timestamp,
            vdf_iterations: self.vdf_iterations,
        };
        serde_json::to_vec(&canonical).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

/// `spec.md` §3 "Rating". Signature binds `{post_id, voter, vote,
/// timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    #[serde(with = "b64::fixed16")]
    pub post_id: [u8; 16],
    pub voter: String,
    pub vote: Vote,
    pub reputation: f64,
    pub timestamp: i64,
    #[serde(with = "b64::bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "b64::bytes")]
    pub voter_pk: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanonicalRating<'a> {
    #[serde(with = "b64::fixed16")]
    pub post_id: [u8; 16],
    pub voter: &'a str,
    pub vote: Vote,
    pub timestamp: i64,
}

impl Rating {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let canonical = CanonicalRating {
            post_id: self.post_id,
            voter: &self.voter,
            vote: self.vote,
            timestamp: self.timestamp,
        };
        serde_json::to_vec(&canonical).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_clamps_to_max() {
        assert_eq!(Post::depth_for(None), 0);
        assert_eq!(Post::depth_for(Some(4)), 5);
        assert_eq!(Post::depth_for(Some(10)), 5);
    }
}
