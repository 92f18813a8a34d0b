//! Answers inbound Kademlia RPCs (`spec.md` §4.4/§6) against local state
//! only, mirroring `ember_net::rpc::DhtRpcClient`'s wire encoding for the
//! client side of the same protocol.

use ember_dht::Dht;
use ember_types::wire::WireMessage;
use ember_types::{b64, DhtContact};
use tokio::sync::Mutex;

fn to_dht_contacts(contacts: Vec<ember_dht::NodeContact>) -> Vec<DhtContact> {
    contacts
        .into_iter()
        .map(|c| DhtContact { node_id: c.node_id, peer_addr: c.peer_addr })
        .collect()
}

/// Builds the reply frame for an inbound DHT RPC, or `None` if `message` is
/// not one of the four RPC request variants (the caller should fall through
/// to its other dispatch tables in that case).
pub async fn respond(dht: &Mutex<Dht>, message: &WireMessage) -> Option<WireMessage> {
    match message {
        WireMessage::Ping { rpc_id } => Some(WireMessage::Pong { rpc_id: rpc_id.clone() }),

        WireMessage::FindNode { rpc_id, target } => {
            let closest = dht.lock().await.closest_known(target, ember_dht::K);
            Some(WireMessage::FindNodeReply {
                rpc_id: rpc_id.clone(),
                closest: to_dht_contacts(closest),
            })
        }

        WireMessage::FindValue { rpc_id, key } => {
            let key_bytes = key.as_bytes();
            let found = dht.lock().await.local_get(key_bytes).await.ok().flatten();
            match found {
                Some(value) => Some(WireMessage::FindValueReply {
                    rpc_id: rpc_id.clone(),
                    value: Some(b64::encode(&value)),
                    closest: Vec::new(),
                }),
                None => {
                    let target = ember_crypto::sha1_20(key_bytes);
                    let closest = dht.lock().await.closest_known(&target, ember_dht::K);
                    Some(WireMessage::FindValueReply {
                        rpc_id: rpc_id.clone(),
                        value: None,
                        closest: to_dht_contacts(closest),
                    })
                }
            }
        }

        WireMessage::Store { rpc_id, key, value } => {
            let value_bytes = b64::decode(value).unwrap_or_default();
            let mut guard = dht.lock().await;
            let _ = guard.local_put(key.as_bytes().to_vec(), value_bytes).await;
            Some(WireMessage::StoreAck { rpc_id: rpc_id.clone() })
        }

        _ => None,
    }
}
