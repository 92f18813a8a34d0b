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
//! Structured logging initialization and lightweight per-crate metrics
//! counters for the ember substrate, grounded on the teacher's
//! `ioi-telemetry` crate and scaled down to this substrate's needs: no
//! exported HTTP `/metrics` surface, since nothing here scrapes one.

pub mod counter;
pub mod init;
pub mod time;

pub use counter::Counter;
pub use init::init_tracing;
pub use time::ScopeTimer;
