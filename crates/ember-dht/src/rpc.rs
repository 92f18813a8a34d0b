//! The network collaborator a `RoutingTable` issues RPCs through: actual
//! wire encoding and timeouts live in `ember-net`.

use crate::contact::{NodeContact, NodeId};
use async_trait::async_trait;

pub enum FindValueResult {
    Value(Vec<u8>),
    CloserPeers(Vec<NodeContact>),
}

#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn ping(&self, target: &NodeContact) -> bool;
    async fn find_node(&self, target: &NodeContact, query: NodeId) -> Option<Vec<NodeContact>>;
    async fn find_value(&self, target: &NodeContact, key: &[u8]) -> Option<FindValueResult>;
    async fn store(&self, target: &NodeContact, key: &[u8], value: &[u8]) -> bool;
}
