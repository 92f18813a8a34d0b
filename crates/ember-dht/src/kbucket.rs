//! `spec.md` §4.4: "160 k-buckets of size 20; replacement cache per bucket."

use crate::contact::NodeContact;
use std::collections::VecDeque;
use std::time::Instant;

pub const K: usize = 20;

pub struct KBucket {
    pub contacts: VecDeque<NodeContact>,
    pub replacement_cache: VecDeque<NodeContact>,
    pub last_touched: Instant,
    capacity: usize,
}

impl KBucket {
    pub fn new(capacity: usize) -> Self {
        Self {
            contacts: VecDeque::new(),
            replacement_cache: VecDeque::new(),
            last_touched: Instant::now(),
            capacity,
        }
    }

    /// Returns `true` if `contact` is now in the live bucket (either already
    /// present, moved to the tail as most-recently-seen, or inserted because
    /// room existed). If the bucket is full and `contact` is new, it lands
    /// in the replacement cache instead and the caller should `ping` the
    /// least-recently-seen live contact.
    pub fn observe(&mut self, contact: NodeContact) -> bool {
        self.last_touched = Instant::now();
        if let Some(pos) = self.contacts.iter().position(|c| c.node_id == contact.node_id) {
            if let Some(existing) = self.contacts.remove(pos) {
                self.contacts.push_back(existing);
            }
            return true;
        }
        if self.contacts.len() < self.capacity {
            self.contacts.push_back(contact);
            return true;
        }
        if !self.replacement_cache.iter().any(|c| c.node_id == contact.node_id) {
            if self.replacement_cache.len() >= self.capacity {
                self.replacement_cache.pop_front();
            }
            self.replacement_cache.push_back(contact);
        }
        false
    }

    /// Drops a dead contact from the live set, promoting the
    /// longest-resident replacement candidate if one exists.
    pub fn evict(&mut self, node_id: &[u8; 20]) {
        self.contacts.retain(|c| &c.node_id != node_id);
        if let Some(replacement) = self.replacement_cache.pop_front() {
            self.contacts.push_back(replacement);
        }
    }

    pub fn least_recently_seen(&self) -> Option<&NodeContact> {
        self.contacts.front()
    }

    pub fn is_stale(&self, refresh_interval: std::time::Duration) -> bool {
        self.last_touched.elapsed() >= refresh_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(byte: u8) -> NodeContact {
        NodeContact {
            node_id: [byte; 20],
            peer_addr: format!("peer-{byte}"),
        }
    }

    #[test]
    fn fills_up_to_capacity_then_spills_to_replacement_cache() {
        let mut bucket = KBucket::new(2);
        assert!(bucket.observe(contact(1)));
        assert!(bucket.observe(contact(2)));
        assert!(!bucket.observe(contact(3)));
        assert_eq!(bucket.contacts.len(), 2);
        assert_eq!(bucket.replacement_cache.len(), 1);
    }

    #[test]
    fn eviction_promotes_from_replacement_cache() {
        let mut bucket = KBucket::new(1);
        bucket.observe(contact(1));
        bucket.observe(contact(2));
        bucket.evict(&[1u8; 20]);
        assert_eq!(bucket.contacts.len(), 1);
        assert_eq!(bucket.contacts.front().map(|c| c.node_id), Some([2u8; 20]));
    }

    #[test]
    fn reobserving_moves_contact_to_tail() {
        let mut bucket = KBucket::new(3);
        bucket.observe(contact(1));
        bucket.observe(contact(2));
        bucket.observe(contact(1));
        assert_eq!(bucket.contacts.back().map(|c| c.node_id), Some([1u8; 20]));
    }
}
