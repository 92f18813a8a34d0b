#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]
//! Length-prefixed JSON-lines transport, per-peer outbound queues, RPC
//! correlation, and wire dispatch: `spec.md` §5, §6.

pub mod codec;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod frame;
pub mod metrics;
pub mod peer_table;
pub mod rpc;

pub use connection::{InboundEnvelope, PeerHandle};
pub use error::NetError;
pub use fetcher::{ChunkRequestTable, NetChunkFetcher};
pub use frame::Frame;
pub use peer_table::PeerTable;
pub use rpc::{DhtRpcClient, PendingRpcTable};
