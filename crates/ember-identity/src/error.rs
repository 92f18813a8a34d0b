//! `spec.md` §7: `InvalidSignature`, `InvalidVDF`, `DuplicateClaim`, `NotFound`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("handle fails validation rules")]
    InvalidHandle,

    #[error("handle already registered")]
    DuplicateClaim,

    #[error("signature failed to verify")]
    InvalidSignature,

    #[error("vdf proof failed to verify")]
    InvalidVdf,

    #[error("no matching provisional claim for handle")]
    NotFound,

    #[error("confirmation slip's claim_hash does not match the tracked claim")]
    ClaimHashMismatch,
}
