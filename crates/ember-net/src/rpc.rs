//! Correlates outstanding request/reply RPCs by `rpc_id`, and the concrete
//! `ember_dht::RpcClient` built on top of it: `spec.md` §4.4 "Kademlia DHT",
//! realized over the wire per §6's `PING/PONG/FIND_NODE/FIND_VALUE/STORE`.

use crate::metrics::metrics;
use crate::peer_table::PeerTable;
use dashmap::DashMap;
use ember_dht::{FindValueResult, NodeContact, RpcClient};
use ember_types::wire::WireMessage;
use ember_types::{b64, DhtContact};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::debug;

const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Outstanding RPCs awaiting a correlated reply, keyed by `rpc_id`. The
/// main loop's inbound dispatch calls [`PendingRpcTable::resolve`] whenever
/// a `*_REPLY`/`PONG`/`STORE_ACK` frame arrives.
#[derive(Clone, Default)]
pub struct PendingRpcTable {
    inner: Arc<DashMap<String, oneshot::Sender<WireMessage>>>,
}

impl PendingRpcTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, rpc_id: String) -> oneshot::Receiver<WireMessage> {
        let (tx, rx) = oneshot::channel();
        self.inner.insert(rpc_id, tx);
        rx
    }

    /// Delivers `message` to the waiter for `rpc_id`, if still pending.
    pub fn resolve(&self, rpc_id: &str, message: WireMessage) {
        if let Some((_, tx)) = self.inner.remove(rpc_id) {
            let _ = tx.send(message);
        } else {
            debug!(rpc_id, "reply for unknown or already-resolved rpc, dropping");
        }
    }

    fn cancel(&self, rpc_id: &str) {
        self.inner.remove(rpc_id);
    }
}

fn new_rpc_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub struct DhtRpcClient {
    peers: PeerTable,
    pending: PendingRpcTable,
}

impl DhtRpcClient {
    pub fn new(peers: PeerTable, pending: PendingRpcTable) -> Self {
        Self { peers, pending }
    }

    async fn roundtrip(&self, target: &NodeContact, rpc_id: String, message: WireMessage) -> Option<WireMessage> {
        let rx = self.pending.register(rpc_id.clone());
        if self.peers.dial(&target.peer_addr).await.is_err() {
            self.pending.cancel(&rpc_id);
            return None;
        }
        if self.peers.send_to(&target.peer_addr, message).await.is_err() {
            self.pending.cancel(&rpc_id);
            return None;
        }
        match timeout(RPC_TIMEOUT, rx).await {
            Ok(Ok(reply)) => Some(reply),
            _ => {
                metrics().rpc_timeouts.incr();
                self.pending.cancel(&rpc_id);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl RpcClient for DhtRpcClient {
    async fn ping(&self, target: &NodeContact) -> bool {
        let rpc_id = new_rpc_id();
        let message = WireMessage::Ping { rpc_id: rpc_id.clone() };
        matches!(self.roundtrip(target, rpc_id, message).await, Some(WireMessage::Pong { .. }))
    }

    async fn find_node(&self, target: &NodeContact, query: ember_dht::NodeId) -> Option<Vec<NodeContact>> {
        let rpc_id = new_rpc_id();
        let message = WireMessage::FindNode { rpc_id: rpc_id.clone(), target: query };
        match self.roundtrip(target, rpc_id, message).await {
            Some(WireMessage::FindNodeReply { closest, .. }) => Some(closest.into_iter().map(from_dht_contact).collect()),
            _ => None,
        }
    }

    async fn find_value(&self, target: &NodeContact, key: &[u8]) -> Option<FindValueResult> {
        let rpc_id = new_rpc_id();
        let message = WireMessage::FindValue {
            rpc_id: rpc_id.clone(),
            key: String::from_utf8_lossy(key).into_owned(),
        };
        match self.roundtrip(target, rpc_id, message).await {
            Some(WireMessage::FindValueReply { value: Some(encoded), .. }) => {
                b64::decode(&encoded).ok().map(FindValueResult::Value)
            }
            Some(WireMessage::FindValueReply { closest, .. }) => {
                Some(FindValueResult::CloserPeers(closest.into_iter().map(from_dht_contact).collect()))
            }
            _ => None,
        }
    }

    async fn store(&self, target: &NodeContact, key: &[u8], value: &[u8]) -> bool {
        let rpc_id = new_rpc_id();
        let message = WireMessage::Store {
            rpc_id: rpc_id.clone(),
            key: String::from_utf8_lossy(key).into_owned(),
            value: b64::encode(value),
        };
        matches!(self.roundtrip(target, rpc_id, message).await, Some(WireMessage::StoreAck { .. }))
    }
}

fn from_dht_contact(contact: DhtContact) -> NodeContact {
    NodeContact {
        node_id: contact.node_id,
        peer_addr: contact.peer_addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolving_an_unregistered_rpc_is_a_harmless_no_op() {
        let pending = PendingRpcTable::new();
        pending.resolve("never-registered", WireMessage::Pong { rpc_id: "x".into() });
    }

    #[tokio::test]
    async fn register_then_resolve_delivers_the_reply() {
        let pending = PendingRpcTable::new();
        let rx = pending.register("abc".into());
        pending.resolve("abc", WireMessage::Pong { rpc_id: "abc".into() });
        let reply = rx.await.unwrap();
        assert_eq!(reply.type_name(), "PONG");
    }
}
