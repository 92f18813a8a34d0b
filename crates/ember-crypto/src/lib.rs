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

//! Signature engine (C2) and the encryption primitives backing end-to-end
//! direct messages: `spec.md` §4.2, §4.8 "End-to-end direct messages".

pub mod boxcrypt;
pub mod error;
pub mod hash;
pub mod sign;

pub use boxcrypt::{decrypt, encrypt, EncBox, EncKeyPair};
pub use error::CryptoError;
pub use hash::{node_id_from_pk, sha1_20, sha256, sha256_concat};
pub use sign::{SignKeyPair, Signer, Verifier};
