//! Per-topic Scribe/Plumtree state: `spec.md` §4.6.

use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;

const SEEN_CACHE_CAPACITY: usize = 4096;

pub struct TreeState {
    pub children: HashSet<String>,
    pub eager: HashSet<String>,
    pub lazy: HashSet<String>,
    pub subscribed_locally: bool,
    pub seen: LruCache<String, ()>,
    pub cached_payloads: LruCache<String, Vec<u8>>,
}

impl TreeState {
    pub fn new() -> Self {
        let cap = NonZeroUsize::new(SEEN_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            children: HashSet::new(),
            eager: HashSet::new(),
            lazy: HashSet::new(),
            subscribed_locally: false,
            seen: LruCache::new(cap),
            cached_payloads: LruCache::new(cap),
        }
    }

    /// `spec.md` §4.6 "a node is in the tree iff it has children or is
    /// itself a subscriber."
    pub fn is_in_tree(&self) -> bool {
        self.subscribed_locally || !self.children.is_empty()
    }
}

impl Default for TreeState {
    fn default() -> Self {
        Self::new()
    }
}
