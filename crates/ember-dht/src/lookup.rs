//! `spec.md` §4.4 iterative lookup: "alpha=3 concurrent RPCs; maintain a
//! shortlist ordered by XOR distance; converge when the alpha closest have
//! all been queried and none produced closer peers."

use crate::contact::{k_closest, xor_distance, NodeContact, NodeId};
use crate::routing_table::RoutingTable;
use crate::rpc::{FindValueResult, RpcClient};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::collections::HashSet;

pub const ALPHA: usize = 3;

pub enum LookupOutcome {
    Value(Vec<u8>),
    ClosestPeers(Vec<NodeContact>),
}

/// `find_node`: always walks to convergence and returns the k closest peers
/// seen.
pub async fn iterative_find_node(
    table: &RoutingTable,
    rpc: &dyn RpcClient,
    target: NodeId,
    k: usize,
) -> Vec<NodeContact> {
    match iterative_lookup(table, rpc, target, k, None).await {
        LookupOutcome::ClosestPeers(peers) => peers,
        LookupOutcome::Value(_) => Vec::new(),
    }
}

/// `find_value`: stops early the moment any queried peer returns a value.
pub async fn iterative_find_value(
    table: &RoutingTable,
    rpc: &dyn RpcClient,
    key: &[u8],
    k: usize,
) -> LookupOutcome {
    let target = ember_crypto::sha1_20(key);
    iterative_lookup(table, rpc, target, k, Some(key)).await
}

async fn iterative_lookup(
    table: &RoutingTable,
    rpc: &dyn RpcClient,
    target: NodeId,
    k: usize,
    value_key: Option<&[u8]>,
) -> LookupOutcome {
    let mut shortlist = table.closest(&target, k);
    let mut queried: HashSet<NodeId> = HashSet::new();
    let mut closest_seen: Vec<NodeContact> = shortlist.clone();

    loop {
        let round: Vec<NodeContact> = shortlist
            .iter()
            .filter(|c| !queried.contains(&c.node_id))
            .take(ALPHA)
            .cloned()
            .collect();
        if round.is_empty() {
            break;
        }
        for c in &round {
            queried.insert(c.node_id);
        }

        let mut inflight = FuturesUnordered::new();
        for contact in round {
            let key = value_key;
            inflight.push(async move {
                if let Some(key) = key {
                    (contact.clone(), rpc.find_value(&contact, key).await.map(Ok))
                } else {
                    (contact.clone(), rpc.find_node(&contact, target).await.map(|peers| Err(peers)))
                }
            });
        }

        let mut progressed = false;
        while let Some((_contact, response)) = inflight.next().await {
            match response {
                Some(Ok(FindValueResult::Value(bytes))) => return LookupOutcome::Value(bytes),
                Some(Ok(FindValueResult::CloserPeers(peers))) | Some(Err(peers)) => {
                    for peer in peers {
                        if !closest_seen.iter().any(|c| c.node_id == peer.node_id) {
                            closest_seen.push(peer.clone());
                            progressed = true;
                        }
                        if !shortlist.iter().any(|c| c.node_id == peer.node_id) {
                            shortlist.push(peer);
                        }
                    }
                }
                None => {}
            }
        }

        k_closest(&mut shortlist, &target, k);
        k_closest(&mut closest_seen, &target, k);
        if !progressed {
            break;
        }
    }

    LookupOutcome::ClosestPeers(closest_seen)
}

/// Stable comparison helper used by callers that want to confirm the
/// shortlist actually converged toward `target` (tests, mostly).
pub fn is_closer(target: &NodeId, a: &NodeId, b: &NodeId) -> bool {
    xor_distance(a, target) < xor_distance(b, target)
}
