//! `spec.md` §4.4 public operations: `ping`, `find_node`, `find_value`,
//! `store`.

use crate::contact::{NodeContact, NodeId};
use crate::error::DhtError;
use crate::kbucket::K;
use crate::lookup::{iterative_find_node, iterative_find_value, LookupOutcome, ALPHA};
use crate::routing_table::{RoutingTable, REFRESH_INTERVAL};
use crate::rpc::RpcClient;
use crate::storage::ReplicationTracker;
use ember_storage::keyspace::DHT_STORAGE;
use ember_storage::KVStore;
use std::sync::Arc;
use tracing::{debug, warn};

pub const REFRESH_INTERVAL_MS: i64 = REFRESH_INTERVAL.as_millis() as i64;

pub struct Dht {
    table: RoutingTable,
    store: Arc<dyn KVStore>,
    rpc: Arc<dyn RpcClient>,
    replication: ReplicationTracker,
}

impl Dht {
    pub fn new(local_id: NodeId, store: Arc<dyn KVStore>, rpc: Arc<dyn RpcClient>) -> Self {
        Self {
            table: RoutingTable::new(local_id),
            store,
            rpc,
            replication: ReplicationTracker::default(),
        }
    }

    pub fn local_id(&self) -> NodeId {
        self.table.local_id()
    }

    /// `spec.md` §4.4 routing-table maintenance: admits `contact`, pinging
    /// out the least-recently-seen live contact if its bucket was full.
    pub async fn observe_contact(&mut self, contact: NodeContact) {
        if let Some(stale_candidate) = self.table.observe(contact.clone()) {
            if self.rpc.ping(&stale_candidate).await {
                // still alive; re-observing it refreshes its position and the
                // newcomer stays in the replacement cache.
                self.table.observe(stale_candidate);
            } else {
                self.table.evict(&stale_candidate.node_id);
                self.table.observe(contact);
            }
        }
    }

    pub async fn ping(&self, target: &NodeContact) -> bool {
        self.rpc.ping(target).await
    }

    pub async fn find_node(&mut self, target: NodeId) -> Vec<NodeContact> {
        let peers = iterative_find_node(&self.table, self.rpc.as_ref(), target, K).await;
        for peer in &peers {
            self.table.observe(peer.clone());
        }
        peers
    }

    /// Checks local storage first, then falls back to an iterative network
    /// lookup.
    pub async fn find_value(&mut self, key: &[u8]) -> Result<Vec<u8>, DhtError> {
        if let Some(local) = self.store.get(DHT_STORAGE, key).await? {
            return Ok(local);
        }
        match iterative_find_value(&self.table, self.rpc.as_ref(), key, K).await {
            LookupOutcome::Value(bytes) => Ok(bytes),
            LookupOutcome::ClosestPeers(peers) => {
                for peer in &peers {
                    self.table.observe(peer.clone());
                }
                Err(DhtError::NotFound)
            }
        }
    }

    /// `spec.md` §4.4 `store(key, value, {propagate}) -> {replicas}`:
    /// persists locally, then propagates to the k closest known peers to
    /// `SHA1(key)`. Returns after the replication pass completes.
    pub async fn store(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<usize, DhtError> {
        self.store.put(DHT_STORAGE, &key, &value).await?;

        let target = key_node_id(&key);
        let peers = iterative_find_node(&self.table, self.rpc.as_ref(), target, K).await;
        let mut replicas = 0usize;
        for peer in &peers {
            if self.rpc.store(peer, &key, &value).await {
                replicas += 1;
            }
            self.table.observe(peer.clone());
        }
        self.replication.record(key, replicas);
        debug!(replicas, "dht store propagated");
        Ok(replicas)
    }

    /// `spec.md` §4.4 "buckets not touched within 1 hour trigger a lookup
    /// of a random id in the bucket's range."
    pub async fn refresh_stale_buckets(&mut self) {
        for idx in self.table.stale_bucket_indices() {
            let random_id = self.table.random_id_in_bucket(idx);
            let _ = self.find_node(random_id).await;
        }
    }

    /// `spec.md` §4.4 "a background refresh loop re-stores values whose
    /// last refresh exceeds `REFRESH_INTERVAL`... under-replicated keys
    /// take priority."
    pub async fn refresh_under_replicated(&mut self) {
        let due = self.replication.due_for_refresh(REFRESH_INTERVAL_MS, K);
        for key in due {
            match self.store.get(DHT_STORAGE, &key).await {
                Ok(Some(value)) => {
                    if let Err(err) = self.store(key, value).await {
                        warn!(?err, "failed to refresh dht replication");
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(?err, "failed to read value during dht refresh"),
            }
        }
    }

    pub fn bootstrap(&mut self, contact: NodeContact) {
        self.table.observe(contact);
    }

    /// The `k` contacts from the local routing table closest to `target`,
    /// for answering an inbound `FIND_NODE`/`FIND_VALUE` without driving a
    /// network lookup.
    pub fn closest_known(&self, target: &NodeId, limit: usize) -> Vec<NodeContact> {
        self.table.closest(target, limit)
    }

    /// Reads `key` from local storage only, for answering an inbound
    /// `FIND_VALUE` request. Does not trigger a network lookup.
    pub async fn local_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DhtError> {
        Ok(self.store.get(DHT_STORAGE, key).await?)
    }

    /// Accepts an inbound `STORE` request: persists locally without
    /// re-propagating, per `spec.md` §4.4 "a node receiving a `STORE` RPC
    /// persists the value and acknowledges; it does not itself re-replicate".
    pub async fn local_put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), DhtError> {
        self.store.put(DHT_STORAGE, &key, &value).await?;
        self.replication.record(key, 1);
        Ok(())
    }

    pub const ALPHA_FANOUT: usize = ALPHA;
}

fn key_node_id(key: &[u8]) -> NodeId {
    ember_crypto::sha1_20(key)
}
