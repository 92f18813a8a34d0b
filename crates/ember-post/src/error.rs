//! `spec.md` §7 error kinds as they apply to posts, ratings, and DMs.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PostError {
    #[error("post content exceeds the maximum size")]
    SizeExceeded,

    #[error("content tripped the toxicity predicate")]
    ToxicContent,

    #[error("signature failed to verify")]
    InvalidSignature,

    #[error("vdf proof failed to verify")]
    InvalidVdf,

    #[error("post not found")]
    NotFound,

    #[error("rating rejected: self-rating is not allowed")]
    SelfRating,

    #[error("rating rejected: older than the replay window")]
    StaleRating,

    #[error("dm recipient has no known encryption key")]
    NoEncryptionKey,
}
