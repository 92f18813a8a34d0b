//! The set of currently connected peers and the dial/accept paths that
//! populate it: `spec.md` §5 "Peer connections are owned by the network
//! driver".

use crate::connection::{spawn_peer, InboundEnvelope, PeerHandle};
use crate::error::NetError;
use crate::frame::Frame;
use crate::metrics::metrics;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct PeerTable {
    connections: Arc<DashMap<String, PeerHandle>>,
    inbound_tx: mpsc::Sender<InboundEnvelope>,
}

impl PeerTable {
    pub fn new(inbound_tx: mpsc::Sender<InboundEnvelope>) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            inbound_tx,
        }
    }

    pub fn is_connected(&self, peer_addr: &str) -> bool {
        self.connections.contains_key(peer_addr)
    }

    pub fn connected_peers(&self) -> Vec<String> {
        self.connections.iter().map(|e| e.key().clone()).collect()
    }

    /// Dials `peer_addr` and registers the resulting connection, reusing an
    /// existing one if already present.
    pub async fn dial(&self, peer_addr: &str) -> Result<PeerHandle, NetError> {
        if let Some(existing) = self.connections.get(peer_addr) {
            return Ok(existing.clone());
        }
        let stream = TcpStream::connect(peer_addr).await?;
        metrics().connections_dialed.incr();
        Ok(self.register(stream, peer_addr.to_string()))
    }

    fn register(&self, stream: TcpStream, peer_addr: String) -> PeerHandle {
        let handle = spawn_peer(stream, peer_addr.clone(), self.inbound_tx.clone());
        self.connections.insert(peer_addr, handle.clone());
        handle
    }

    pub fn disconnect(&self, peer_addr: &str) {
        self.connections.remove(peer_addr);
    }

    pub async fn send_to(&self, peer_addr: &str, frame: impl Into<Frame>) -> Result<(), NetError> {
        let handle = self.connections.get(peer_addr).ok_or_else(|| NetError::NotConnected(peer_addr.to_string()))?;
        if handle.send(frame.into()).await {
            Ok(())
        } else {
            self.connections.remove(peer_addr);
            Err(NetError::QueueClosed)
        }
    }

    /// Best-effort fan-out to every connected peer, per `spec.md` §4.8
    /// "direct broadcast"; unreachable peers are dropped from the table.
    pub async fn broadcast(&self, frame: impl Into<Frame>) {
        let frame = frame.into();
        let peers = self.connected_peers();
        for peer in peers {
            let _ = self.send_to(&peer, frame.clone()).await;
        }
    }

    /// Accepts inbound connections on `listener` until the task is
    /// cancelled, registering each one as it arrives.
    pub async fn accept_loop(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    metrics().connections_accepted.incr();
                    info!(%addr, "accepted inbound peer connection");
                    self.register(stream, addr.to_string());
                }
                Err(err) => {
                    debug!(%err, "accept() failed, continuing");
                }
            }
        }
    }
}
