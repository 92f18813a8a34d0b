//! `spec.md` §7 error kinds as they apply to the transport layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("peer {0} is not connected")]
    NotConnected(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("peer send queue is closed")]
    QueueClosed,

    #[error("rpc {0} timed out")]
    RpcTimedOut(String),
}
