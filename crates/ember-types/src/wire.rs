//! The wire message set: `spec.md` §6 "External interfaces".
//!
//! Decoding is a single tagged-union dispatch on `type`; unknown variants
//! fail to deserialize and are dropped by the caller with a debug log
//! (`spec.md` §9 "Polymorphism over wire messages").

use crate::b64;
use crate::identity::{ConfirmationSlip, Identity};
use crate::post::{Attestation, Post, Rating};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    #[serde(rename = "provisional_identity_claim")]
    ProvisionalIdentityClaim { claim: Identity },

    #[serde(rename = "identity_confirmation_slip")]
    IdentityConfirmationSlip { slip: ConfirmationSlip },

    #[serde(rename = "new_post")]
    NewPost { post: Post },

    /// Stem-phase relay of a freshly composed post, `spec.md` §4.8 step 5's
    /// "privacy-preferring route": each hop either forwards to one more
    /// random stem peer or, once its own stem timer lapses or no further
    /// stem peer is available, fluffs the post as an ordinary `NewPost`
    /// broadcast.
    #[serde(rename = "dandelion_stem")]
    DandelionStem { post: Post },

    #[serde(rename = "parent_update")]
    ParentUpdate {
        #[serde(with = "b64::fixed16")]
        parent_id: [u8; 16],
        #[serde(with = "b64::fixed16")]
        reply_id: [u8; 16],
    },

    #[serde(rename = "carrier_update")]
    CarrierUpdate {
        #[serde(with = "b64::fixed16")]
        post_id: [u8; 16],
        peer: String,
        carrying: bool,
    },

    #[serde(rename = "post_attestation")]
    PostAttestation {
        attestation: Attestation,
        attester_handle: String,
        #[serde(with = "b64::bytes")]
        attester_pk: Vec<u8>,
        #[serde(with = "b64::bytes")]
        signature: Vec<u8>,
    },

    #[serde(rename = "post_rating")]
    PostRating { rating: Rating },

    #[serde(rename = "e2e_dm")]
    E2eDm {
        recipient: String,
        sender: String,
        #[serde(with = "b64::bytes")]
        ciphertext: Vec<u8>,
        #[serde(with = "b64::bytes")]
        nonce: Vec<u8>,
        ts: i64,
        #[serde(default)]
        routing_hint: Option<String>,
        #[serde(default)]
        message_id: Option<String>,
        #[serde(default)]
        is_retry: bool,
    },

    #[serde(rename = "dm_delivered")]
    DmDelivered {
        message_id: String,
        recipient: String,
        delivered_at: i64,
    },

    #[serde(rename = "request_image_chunks")]
    RequestImageChunks {
        #[serde(with = "b64::fixed32")]
        image_hash: [u8; 32],
        chunk_hashes: Vec<[u8; 32]>,
        request_id: String,
    },

    #[serde(rename = "image_chunk")]
    ImageChunk {
        #[serde(with = "b64::fixed32")]
        image_hash: [u8; 32],
        #[serde(with = "b64::fixed32")]
        chunk_hash: [u8; 32],
        #[serde(with = "b64::bytes")]
        data: Vec<u8>,
        #[serde(default)]
        request_id: Option<String>,
    },

    #[serde(rename = "peer_exchange")]
    PeerExchange { peers: Vec<PeerRef> },

    // --- Kademlia DHT RPCs (`spec.md` §4.4) ---
    #[serde(rename = "PING")]
    Ping { rpc_id: String },
    #[serde(rename = "PONG")]
    Pong { rpc_id: String },
    #[serde(rename = "FIND_NODE")]
    FindNode {
        rpc_id: String,
        #[serde(with = "b64::fixed20")]
        target: [u8; 20],
    },
    #[serde(rename = "FIND_NODE_REPLY")]
    FindNodeReply {
        rpc_id: String,
        closest: Vec<DhtContact>,
    },
    #[serde(rename = "FIND_VALUE")]
    FindValue { rpc_id: String, key: String },
    #[serde(rename = "FIND_VALUE_REPLY")]
    FindValueReply {
        rpc_id: String,
        value: Option<String>,
        closest: Vec<DhtContact>,
    },
    #[serde(rename = "STORE")]
    Store {
        rpc_id: String,
        key: String,
        value: String,
    },
    #[serde(rename = "STORE_ACK")]
    StoreAck { rpc_id: String },

    // --- Scribe / Plumtree (`spec.md` §4.6) ---
    #[serde(rename = "SUBSCRIBE")]
    Subscribe { topic: String },
    #[serde(rename = "UNSUBSCRIBE")]
    Unsubscribe { topic: String },
    #[serde(rename = "MULTICAST")]
    Multicast {
        topic: String,
        msg_id: String,
        #[serde(with = "b64::bytes")]
        payload: Vec<u8>,
    },
    #[serde(rename = "IHAVE")]
    IHave { topic: String, msg_id: String },
    #[serde(rename = "GRAFT")]
    Graft { topic: String, msg_id: String },
    #[serde(rename = "PRUNE")]
    Prune { topic: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhtContact {
    #[serde(with = "b64::fixed20")]
    pub node_id: [u8; 20],
    pub peer_addr: String,
}

impl WireMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ProvisionalIdentityClaim { .. } => "provisional_identity_claim",
            Self::IdentityConfirmationSlip { .. } => "identity_confirmation_slip",
            Self::NewPost { .. } => "new_post",
            Self::DandelionStem { .. } => "dandelion_stem",
            Self::ParentUpdate { .. } => "parent_update",
            Self::CarrierUpdate { .. } => "carrier_update",
            Self::PostAttestation { .. } => "post_attestation",
            Self::PostRating { .. } => "post_rating",
            Self::E2eDm { .. } => "e2e_dm",
            Self::DmDelivered { .. } => "dm_delivered",
            Self::RequestImageChunks { .. } => "request_image_chunks",
            Self::ImageChunk { .. } => "image_chunk",
            Self::PeerExchange { .. } => "peer_exchange",
            Self::Ping { .. } => "PING",
            Self::Pong { .. } => "PONG",
            Self::FindNode { .. } => "FIND_NODE",
            Self::FindNodeReply { .. } => "FIND_NODE_REPLY",
            Self::FindValue { .. } => "FIND_VALUE",
            Self::FindValueReply { .. } => "FIND_VALUE_REPLY",
            Self::Store { .. } => "STORE",
            Self::StoreAck { .. } => "STORE_ACK",
            Self::Subscribe { .. } => "SUBSCRIBE",
            Self::Unsubscribe { .. } => "UNSUBSCRIBE",
            Self::Multicast { .. } => "MULTICAST",
            Self::IHave { .. } => "IHAVE",
            Self::Graft { .. } => "GRAFT",
            Self::Prune { .. } => "PRUNE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_fails_to_decode() {
        let raw = r#"{"type":"not_a_real_message","foo":1}"#;
        assert!(serde_json::from_str::<WireMessage>(raw).is_err());
    }

    #[test]
    fn ping_roundtrips() {
        let msg = WireMessage::Ping {
            rpc_id: "abc".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: WireMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.type_name(), "PING");
    }
}
