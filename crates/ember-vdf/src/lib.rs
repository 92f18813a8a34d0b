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

//! Verifiable delay function engine (C1): `spec.md` §4.1.
//!
//! A Wesolowski-style proof of sequential work over a fixed RSA group. The
//! exact group/proof scheme is an Open Question in `spec.md` §9 ("Exact VDF
//! group and proof scheme"); see `DESIGN.md` for the decision this crate
//! makes.

pub mod difficulty;
pub mod error;
pub mod group;
pub mod primes;
pub mod wesolowski;

pub use difficulty::{adaptive_target_ms, estimate_iterations_for_ms};
pub use error::VdfError;
pub use ember_types::{Calibration, VdfProof};
pub use wesolowski::{compute, verify, ComputeHandle};
