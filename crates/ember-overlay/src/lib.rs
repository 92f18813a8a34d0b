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
//! HyParView partial-view overlay membership: `spec.md` §4.5.

pub mod membership;

pub use membership::{HyParView, OverlayAction, OverlayMessage, DEFAULT_ACTIVE_VIEW, DEFAULT_PASSIVE_VIEW};
