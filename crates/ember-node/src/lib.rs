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
//! Wires every ember substrate crate into a single running peer: identity
//! admission, post composition and verification, carriage/GC, the Kademlia
//! DHT, HyParView overlay membership, Scribe/Plumtree multicast, the blob
//! store, and end-to-end direct messages.

pub mod config;
pub mod core;
pub mod dandelion;
pub mod dht_responder;
pub mod dm_directory;
pub mod error;
pub mod identity_flow;
pub mod keys;
pub mod multicast_driver;
pub mod overlay_driver;
pub mod toxicity;

pub use config::CoreConfig;
pub use core::Core;
pub use error::NodeError;
