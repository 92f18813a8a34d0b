//! Per-peer connection actor: `spec.md` §5 "Peer connections are owned by
//! the network driver; the main loop sends via a per-peer outbound queue."

use crate::codec::{decode, encode, frame_stream};
use crate::frame::Frame;
use crate::metrics::metrics;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const OUTBOUND_QUEUE_DEPTH: usize = 256;

/// A decoded frame tagged with the peer address it arrived from, handed
/// to the main loop's dispatch table.
#[derive(Debug, Clone)]
pub struct InboundEnvelope {
    pub from: String,
    pub message: Frame,
}

/// The main loop's handle to a connected peer: an outbound queue feeding the
/// peer's writer half. Dropping every clone closes the queue and ends the
/// connection's writer task.
#[derive(Clone)]
pub struct PeerHandle {
    pub peer_addr: String,
    outbound_tx: mpsc::Sender<Frame>,
}

impl PeerHandle {
    pub async fn send(&self, frame: impl Into<Frame>) -> bool {
        self.outbound_tx.send(frame.into()).await.is_ok()
    }
}

/// Splits `stream` into reader/writer halves and spawns the two tasks that
/// drive them: the reader decodes frames and forwards them to `inbound_tx`;
/// the writer drains `outbound_tx` and encodes frames onto the socket.
/// Returns the handle the main loop uses to queue outbound sends.
pub fn spawn_peer(stream: TcpStream, peer_addr: String, inbound_tx: mpsc::Sender<InboundEnvelope>) -> PeerHandle {
    let framed = frame_stream(stream);
    let (mut sink, mut source) = framed.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(OUTBOUND_QUEUE_DEPTH);

    let reader_peer = peer_addr.clone();
    tokio::spawn(async move {
        while let Some(frame) = source.next().await {
            let bytes = match frame {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(peer = %reader_peer, %err, "connection read error");
                    break;
                }
            };
            match decode(&bytes) {
                Ok(message) => {
                    metrics().inbound_messages.incr();
                    if inbound_tx
                        .send(InboundEnvelope { from: reader_peer.clone(), message })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(err) => {
                    debug!(peer = %reader_peer, %err, "dropped frame with unknown or malformed type");
                }
            }
        }
        debug!(peer = %reader_peer, "peer reader task ended");
    });

    let writer_peer = peer_addr.clone();
    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let bytes = match encode(&message) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(peer = %writer_peer, %err, "failed to encode outbound message");
                    continue;
                }
            };
            if sink.send(Bytes::from(bytes)).await.is_err() {
                break;
            }
            metrics().outbound_messages.incr();
        }
        debug!(peer = %writer_peer, "peer writer task ended");
    });

    PeerHandle { peer_addr, outbound_tx }
}
