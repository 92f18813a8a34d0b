//! Pending direct-message store-and-forward record: `spec.md` §3 "Pending
//! DM", §4.8 "End-to-end direct messages".

use crate::b64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DmStatus {
    Pending,
    Delivered,
    Failed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedPayload {
    #[serde(with = "b64::bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64::bytes")]
    pub nonce: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDm {
    pub id: String,
    pub sender: String,
    pub recipient: String,
    /// Kept locally so the sending UI can redisplay the message; never sent
    /// on the wire (`spec.md` §4.8 names this `plaintext_for_UI_only`).
    pub plaintext: String,
    pub encrypted: EncryptedPayload,
    pub created_ts: i64,
    pub attempts: u32,
    pub last_attempt_ts: i64,
    pub status: DmStatus,
    pub expires_ts: i64,
}

impl PendingDm {
    pub const MAX_ATTEMPTS: u32 = 10;
    pub const TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= Self::MAX_ATTEMPTS
    }
}
