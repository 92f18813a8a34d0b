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
//! Identity admission and the confirmation-quorum registry: `spec.md` §4.7.

pub mod error;
pub mod lifecycle;
pub mod registry;

pub use error::IdentityError;
pub use lifecycle::{ClaimState, PROVISIONAL_TTL_MS};
pub use registry::{IdentityRegistry, DEFAULT_QUORUM};
