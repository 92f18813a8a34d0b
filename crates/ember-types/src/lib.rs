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

//! Core data model, canonical signing encodings, and wire message set for the
//! ember ephemeral social substrate.

pub mod b64;
pub mod blob;
pub mod dm;
pub mod identity;
pub mod post;
pub mod time;
pub mod vdfproof;
pub mod wire;

pub use blob::{BlobMeta, ChunkRef};
pub use dm::{DmStatus, PendingDm};
pub use identity::{Calibration, ConfirmationSlip, Identity, ProvisionalClaim};
pub use post::{Attestation, Post, Rating, Vote};
pub use time::now_ms;
pub use vdfproof::VdfProof;
pub use wire::{DhtContact, WireMessage};
