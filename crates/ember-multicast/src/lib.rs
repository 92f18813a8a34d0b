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
//! Scribe rendezvous-tree topic multicast with Plumtree eager/lazy
//! dissemination: `spec.md` §4.6.

pub mod engine;
pub mod topics;
pub mod tree;

pub use engine::{MulticastAction, MulticastEngine, GRAFT_TIMEOUT};
pub use topics::{extract_topics, DEFAULT_TOPIC};

/// `root(t) = H(t)` in the DHT keyspace: `spec.md` §4.6.
pub fn topic_root(topic: &str) -> [u8; 20] {
    ember_crypto::sha1_20(topic.as_bytes())
}
