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
//! Kademlia-style DHT: 160-bit XOR keyspace, k-buckets, iterative lookup,
//! and replicated key/value storage. `spec.md` §4.4.

pub mod contact;
pub mod dht;
pub mod error;
pub mod kbucket;
pub mod lookup;
pub mod routing_table;
pub mod rpc;
pub mod storage;

pub use contact::{NodeContact, NodeId};
pub use dht::Dht;
pub use error::DhtError;
pub use kbucket::K;
pub use lookup::ALPHA;
pub use rpc::{FindValueResult, RpcClient};

/// `identity:handle:<handle>` per `spec.md` §3 "DHT key conventions".
pub fn identity_key(handle: &str) -> Vec<u8> {
    format!("identity:handle:{handle}").into_bytes()
}

/// `profile:<handle>`.
pub fn profile_key(handle: &str) -> Vec<u8> {
    format!("profile:{handle}").into_bytes()
}

/// `routing:<handle>`.
pub fn routing_key(handle: &str) -> Vec<u8> {
    format!("routing:{handle}").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ember_storage::keyspace::DHT_STORAGE;
    use ember_storage::{KVStore, MemStore};
    use rpc::FindValueResult;
    use std::sync::Arc;

    /// A single-remote-peer stub: `find_node` reports no other peers, so
    /// lookups terminate after one round; `store`/`find_value` write
    /// straight through to the remote's own `KVStore`.
    struct SinglePeerRpc {
        remote_store: Arc<dyn KVStore>,
    }

    #[async_trait]
    impl RpcClient for SinglePeerRpc {
        async fn ping(&self, _target: &NodeContact) -> bool {
            true
        }

        async fn find_node(&self, _target: &NodeContact, _query: NodeId) -> Option<Vec<NodeContact>> {
            Some(Vec::new())
        }

        async fn find_value(&self, _target: &NodeContact, key: &[u8]) -> Option<FindValueResult> {
            match self.remote_store.get(DHT_STORAGE, key).await.ok()? {
                Some(value) => Some(FindValueResult::Value(value)),
                None => Some(FindValueResult::CloserPeers(Vec::new())),
            }
        }

        async fn store(&self, _target: &NodeContact, key: &[u8], value: &[u8]) -> bool {
            self.remote_store.put(DHT_STORAGE, key, value).await.is_ok()
        }
    }

    fn dht_with_one_peer() -> (Dht, NodeContact) {
        let remote_store: Arc<dyn KVStore> = Arc::new(MemStore::new());
        let rpc = Arc::new(SinglePeerRpc { remote_store });
        let local_store: Arc<dyn KVStore> = Arc::new(MemStore::new());
        let mut dht = Dht::new([1u8; 20], local_store, rpc);
        let peer = NodeContact { node_id: [2u8; 20], peer_addr: "peer".into() };
        dht.bootstrap(peer.clone());
        (dht, peer)
    }

    #[tokio::test]
    async fn stored_value_is_found_locally() {
        let (mut dht, _peer) = dht_with_one_peer();
        let replicas = dht.store(b"identity:handle:alice".to_vec(), b"alice-identity".to_vec()).await.unwrap();
        assert_eq!(replicas, 1);
        let found = dht.find_value(b"identity:handle:alice").await.unwrap();
        assert_eq!(found, b"alice-identity".to_vec());
    }

    #[tokio::test]
    async fn find_value_for_unknown_key_reports_not_found() {
        let (mut dht, _peer) = dht_with_one_peer();
        let err = dht.find_value(b"no-such-key").await;
        assert!(matches!(err, Err(DhtError::NotFound)));
    }

    #[test]
    fn dht_key_conventions_match_spec_prefixes() {
        assert_eq!(identity_key("alice"), b"identity:handle:alice".to_vec());
        assert_eq!(profile_key("alice"), b"profile:alice".to_vec());
        assert_eq!(routing_key("alice"), b"routing:alice".to_vec());
    }
}
