//! `spec.md` §4.4: 160 k-buckets indexed by shared-prefix length with the
//! local node id.

use crate::contact::{xor_distance, NodeContact, NodeId};
use crate::kbucket::{KBucket, K};
use std::time::Duration;

pub const NUM_BUCKETS: usize = 160;
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

pub struct RoutingTable {
    local_id: NodeId,
    buckets: Vec<KBucket>,
}

/// Index of the highest set bit in `distance`, counted from the most
/// significant bit of the array (bucket 0 holds the very closest peers).
fn bucket_index_for_distance(distance: &NodeId) -> Option<usize> {
    for (byte_idx, byte) in distance.iter().enumerate() {
        if *byte != 0 {
            let leading = byte.leading_zeros() as usize;
            return Some(byte_idx * 8 + leading);
        }
    }
    None
}

impl RoutingTable {
    pub fn new(local_id: NodeId) -> Self {
        Self {
            local_id,
            buckets: (0..NUM_BUCKETS).map(|_| KBucket::new(K)).collect(),
        }
    }

    pub fn local_id(&self) -> NodeId {
        self.local_id
    }

    fn bucket_for(&mut self, node_id: &NodeId) -> Option<&mut KBucket> {
        let distance = xor_distance(&self.local_id, node_id);
        let idx = bucket_index_for_distance(&distance)?;
        self.buckets.get_mut(idx)
    }

    /// Returns the contact that should be pinged to confirm liveness before
    /// the observed contact can be admitted, if the bucket was full.
    pub fn observe(&mut self, contact: NodeContact) -> Option<NodeContact> {
        if contact.node_id == self.local_id {
            return None;
        }
        let node_id = contact.node_id;
        let bucket = self.bucket_for(&node_id)?;
        let admitted = bucket.observe(contact);
        if admitted {
            None
        } else {
            bucket.least_recently_seen().cloned()
        }
    }

    pub fn evict(&mut self, node_id: &NodeId) {
        if let Some(bucket) = self.bucket_for(node_id) {
            bucket.evict(node_id);
        }
    }

    pub fn closest(&self, target: &NodeId, limit: usize) -> Vec<NodeContact> {
        let mut all: Vec<NodeContact> = self.buckets.iter().flat_map(|b| b.contacts.iter().cloned()).collect();
        crate::contact::k_closest(&mut all, target, limit);
        all
    }

    pub fn stale_bucket_indices(&self) -> Vec<usize> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.contacts.is_empty() && b.is_stale(REFRESH_INTERVAL))
            .map(|(i, _)| i)
            .collect()
    }

    /// A random id falling inside the numeric range owned by bucket `idx`,
    /// used to drive `spec.md` §4.4 "bucket refresh... lookup of a random
    /// id in the bucket's range".
    pub fn random_id_in_bucket(&self, idx: usize) -> NodeId {
        let mut id = self.local_id;
        let byte_idx = idx / 8;
        let bit_in_byte = idx % 8;
        let flip_mask = 0x80u8 >> bit_in_byte;
        if let Some(b) = id.get_mut(byte_idx) {
            *b ^= flip_mask;
        }
        let mut rng = rand::thread_rng();
        use rand::RngCore;
        for (i, byte) in id.iter_mut().enumerate() {
            if i > byte_idx {
                *byte = rng.next_u32() as u8;
            } else if i == byte_idx {
                let tail_mask = flip_mask.wrapping_sub(1);
                *byte = (*byte & !tail_mask) | (rng.next_u32() as u8 & tail_mask);
            }
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observing_self_is_ignored() {
        let local = [1u8; 20];
        let mut table = RoutingTable::new(local);
        assert!(table.observe(NodeContact { node_id: local, peer_addr: "me".into() }).is_none());
        assert!(table.closest(&local, 20).is_empty());
    }

    #[test]
    fn observed_contacts_are_findable_as_closest() {
        let mut table = RoutingTable::new([0u8; 20]);
        let other = NodeContact { node_id: [1u8; 20], peer_addr: "p".into() };
        table.observe(other.clone());
        let closest = table.closest(&[1u8; 20], 5);
        assert_eq!(closest.len(), 1);
        assert_eq!(closest[0].node_id, other.node_id);
    }

    #[test]
    fn bucket_index_groups_by_shared_prefix() {
        let mut far = [0u8; 20];
        if let Some(b) = far.get_mut(0) {
            *b = 0x80;
        }
        assert_eq!(bucket_index_for_distance(&far), Some(0));
        let mut near = [0u8; 20];
        if let Some(b) = near.get_mut(19) {
            *b = 0x01;
        }
        assert_eq!(bucket_index_for_distance(&near), Some(159));
        assert_eq!(bucket_index_for_distance(&[0u8; 20]), None);
    }
}
