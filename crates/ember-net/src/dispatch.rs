//! Inbound dispatch table: `spec.md` §6 "dispatched through a match table in
//! `ember-net`", §9 "Polymorphism over wire messages... decoding is a
//! dispatch table to typed handlers".
//!
//! Transport-level reply types (DHT RPC replies, image chunk replies) are
//! consumed here against their correlation tables and never forwarded
//! upward. Everything else — `new_post`, `post_attestation`, DMs, and
//! `Frame::Overlay` HyParView control traffic — is application state and is
//! forwarded to the caller's handler unchanged.

use crate::connection::InboundEnvelope;
use crate::fetcher::ChunkRequestTable;
use crate::frame::Frame;
use crate::rpc::PendingRpcTable;
use ember_types::wire::WireMessage;

/// Feeds one inbound envelope through the transport-level correlation
/// tables. Returns `Some(envelope)` if the frame is application-level and
/// should be handled further up the stack; `None` if it was consumed here.
pub async fn route_inbound(
    envelope: InboundEnvelope,
    pending_rpc: &PendingRpcTable,
    chunk_requests: &ChunkRequestTable,
) -> Option<InboundEnvelope> {
    let Frame::Wire(wire) = &envelope.message else {
        return Some(envelope);
    };
    match wire {
        WireMessage::Pong { rpc_id }
        | WireMessage::FindNodeReply { rpc_id, .. }
        | WireMessage::FindValueReply { rpc_id, .. }
        | WireMessage::StoreAck { rpc_id } => {
            pending_rpc.resolve(rpc_id, wire.clone());
            None
        }
        WireMessage::ImageChunk { chunk_hash, data, request_id: Some(request_id), .. } => {
            chunk_requests.deliver(request_id, *chunk_hash, data.clone()).await;
            None
        }
        _ => Some(envelope),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pong_is_consumed_and_resolves_the_pending_rpc() {
        let pending = PendingRpcTable::new();
        let chunks = ChunkRequestTable::new();
        let rx = pending.register("abc".into());

        let envelope = InboundEnvelope {
            from: "127.0.0.1:1".into(),
            message: Frame::Wire(WireMessage::Pong { rpc_id: "abc".into() }),
        };
        let forwarded = route_inbound(envelope, &pending, &chunks).await;
        assert!(forwarded.is_none());
        assert_eq!(rx.await.unwrap().type_name(), "PONG");
    }

    #[tokio::test]
    async fn subscribe_is_forwarded_upward() {
        let pending = PendingRpcTable::new();
        let chunks = ChunkRequestTable::new();
        let envelope = InboundEnvelope {
            from: "127.0.0.1:1".into(),
            message: Frame::Wire(WireMessage::Subscribe { topic: "general".into() }),
        };
        let forwarded = route_inbound(envelope, &pending, &chunks).await;
        assert!(forwarded.is_some());
    }

    #[tokio::test]
    async fn overlay_control_traffic_is_forwarded_upward_untouched() {
        use ember_overlay::OverlayMessage;

        let pending = PendingRpcTable::new();
        let chunks = ChunkRequestTable::new();
        let envelope = InboundEnvelope {
            from: "127.0.0.1:1".into(),
            message: Frame::Overlay(OverlayMessage::Disconnect { peer: "127.0.0.1:2".into() }),
        };
        let forwarded = route_inbound(envelope, &pending, &chunks).await;
        assert!(forwarded.is_some());
    }
}
