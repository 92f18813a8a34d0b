//! End-to-end direct messages: `spec.md` §4.8 "End-to-end direct messages".

use crate::error::PostError;
use async_trait::async_trait;
use ember_crypto::{decrypt, encrypt, EncKeyPair};
use ember_types::dm::{DmStatus, EncryptedPayload, PendingDm};
use ember_types::time::now_ms;
use ember_types::wire::WireMessage;
use std::time::Duration;
use tracing::debug;

/// `spec.md` §4.8 "Resolve recipient via identity registry (up to 3 retries
/// with linear backoff)." Kept as an injected seam so this crate never
/// depends directly on the networking layer, matching the `RpcClient`/
/// `ChunkFetcher` pattern used elsewhere in this workspace.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn encryption_key_for(&self, handle: &str) -> Option<Vec<u8>>;
}

pub const RESOLVE_MAX_RETRIES: u32 = 3;
const RESOLVE_BACKOFF_STEP: Duration = Duration::from_millis(200);

pub async fn resolve_recipient(directory: &dyn RecipientDirectory, handle: &str) -> Result<Vec<u8>, PostError> {
    for attempt in 0..RESOLVE_MAX_RETRIES {
        if let Some(pk_enc) = directory.encryption_key_for(handle).await {
            return Ok(pk_enc);
        }
        if attempt + 1 < RESOLVE_MAX_RETRIES {
            tokio::time::sleep(RESOLVE_BACKOFF_STEP * (attempt + 1)).await;
        }
    }
    Err(PostError::NoEncryptionKey)
}

/// `spec.md` §4.8 delivery ordering: "direct peer if connected -> DHT-routed
/// hint to closest known peers -> store-and-forward for offline
/// recipients."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryRoute {
    DirectPeer,
    DhtRouted,
    StoreAndForward,
}

pub fn choose_route(peer_connected: bool, has_dht_route: bool) -> DeliveryRoute {
    if peer_connected {
        DeliveryRoute::DirectPeer
    } else if has_dht_route {
        DeliveryRoute::DhtRouted
    } else {
        DeliveryRoute::StoreAndForward
    }
}

pub struct DmEngine {
    self_handle: String,
    enc_keypair: EncKeyPair,
}

impl DmEngine {
    pub fn new(self_handle: String, enc_keypair: EncKeyPair) -> Self {
        Self { self_handle, enc_keypair }
    }

    /// `spec.md` §4.8 `send` steps 1-2: encrypts `text` for `recipient_pk_enc`
    /// and builds both the durable store-and-forward record and the wire
    /// message to attempt first.
    pub fn prepare_send(&self, recipient: &str, text: &str, recipient_pk_enc: &[u8]) -> Result<(PendingDm, WireMessage), PostError> {
        let (ciphertext, nonce) = encrypt(recipient_pk_enc, &self.enc_keypair, text.as_bytes())
            .map_err(|_| PostError::NoEncryptionKey)?;
        let now = now_ms();
        let id = uuid::Uuid::new_v4().to_string();

        let pending = PendingDm {
            id: id.clone(),
            sender: self.self_handle.clone(),
            recipient: recipient.to_string(),
            plaintext: text.to_string(),
            encrypted: EncryptedPayload {
                ciphertext: ciphertext.clone(),
                nonce: nonce.clone(),
            },
            created_ts: now,
            attempts: 0,
            last_attempt_ts: now,
            status: DmStatus::Pending,
            expires_ts: now + PendingDm::TTL_MS,
        };
        let wire = WireMessage::E2eDm {
            recipient: recipient.to_string(),
            sender: self.self_handle.clone(),
            ciphertext,
            nonce,
            ts: now,
            routing_hint: None,
            message_id: Some(id),
            is_retry: false,
        };
        Ok((pending, wire))
    }

    /// `spec.md` §4.8 "On receipt: if `recipient == self`, decrypt; on
    /// failure, drop silently." Returns `None` on decrypt failure, which the
    /// caller treats as a silent drop.
    pub fn try_decrypt(&self, sender_pk_enc: &[u8], ciphertext: &[u8], nonce: &[u8]) -> Option<String> {
        let plaintext = decrypt(sender_pk_enc, &self.enc_keypair, ciphertext, nonce).ok()?;
        String::from_utf8(plaintext).ok()
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.enc_keypair.public_key_bytes()
    }

    /// The signed `dm_delivered` receipt sent back to the sender on
    /// successful decryption of a retried message.
    pub fn build_receipt(&self, message_id: String, recipient: String) -> WireMessage {
        WireMessage::DmDelivered {
            message_id,
            recipient,
            delivered_at: now_ms(),
        }
    }
}

/// Records a delivery attempt; transitions to `failed` once
/// [`PendingDm::MAX_ATTEMPTS`] is reached (`spec.md` §4.8 "Failure count").
pub fn record_attempt(pending: &mut PendingDm, now_ms: i64) {
    pending.attempts += 1;
    pending.last_attempt_ts = now_ms;
    if pending.is_exhausted() {
        pending.status = DmStatus::Failed;
        debug!(id = %pending.id, "dm retries exhausted, marking failed");
    }
}

/// `spec.md` §4.8 "a signed `dm_delivered` receipt that flips the
/// sender-side pending record to `delivered`."
pub fn apply_delivery_receipt(pending: &mut PendingDm) {
    pending.status = DmStatus::Delivered;
}

/// TTL expiry check, independent of the retry counter.
pub fn expire_if_due(pending: &mut PendingDm, now_ms: i64) {
    if pending.status == DmStatus::Pending && now_ms >= pending.expires_ts {
        pending.status = DmStatus::Expired;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyDirectory {
        fail_times: std::sync::atomic::AtomicU32,
        key: Vec<u8>,
    }

    #[async_trait]
    impl RecipientDirectory for FlakyDirectory {
        async fn encryption_key_for(&self, _handle: &str) -> Option<Vec<u8>> {
            let remaining = self.fail_times.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            if remaining == 0 {
                Some(self.key.clone())
            } else {
                None
            }
        }
    }

    #[tokio::test]
    async fn resolve_succeeds_after_retries() {
        let directory = FlakyDirectory {
            fail_times: std::sync::atomic::AtomicU32::new(1),
            key: vec![1, 2, 3],
        };
        let pk = resolve_recipient(&directory, "bob").await.unwrap();
        assert_eq!(pk, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn resolve_fails_when_never_found() {
        let directory = FlakyDirectory {
            fail_times: std::sync::atomic::AtomicU32::new(999),
            key: vec![],
        };
        let err = resolve_recipient(&directory, "bob").await.unwrap_err();
        assert_eq!(err, PostError::NoEncryptionKey);
    }

    #[test]
    fn send_then_receive_round_trips() {
        let alice = EncKeyPair::generate();
        let bob = EncKeyPair::generate();
        let alice_engine = DmEngine::new("alice".into(), alice);
        let bob_engine = DmEngine::new("bob".into(), bob);

        let (pending, wire) = alice_engine
            .prepare_send("bob", "hi bob", &bob_engine.public_key_bytes())
            .unwrap();
        assert_eq!(pending.status, DmStatus::Pending);

        let WireMessage::E2eDm { ciphertext, nonce, .. } = wire else {
            panic!("expected e2e_dm");
        };
        let plaintext = bob_engine
            .try_decrypt(&alice_engine.public_key_bytes(), &ciphertext, &nonce)
            .unwrap();
        assert_eq!(plaintext, "hi bob");
    }

    #[test]
    fn retry_exhaustion_marks_failed() {
        let alice = EncKeyPair::generate();
        let bob_pk = EncKeyPair::generate().public_key_bytes();
        let engine = DmEngine::new("alice".into(), alice);
        let (mut pending, _wire) = engine.prepare_send("bob", "hi", &bob_pk).unwrap();

        for i in 0..PendingDm::MAX_ATTEMPTS {
            record_attempt(&mut pending, i as i64);
        }
        assert_eq!(pending.status, DmStatus::Failed);
    }

    #[test]
    fn ttl_expiry_flips_pending_to_expired() {
        let alice = EncKeyPair::generate();
        let bob_pk = EncKeyPair::generate().public_key_bytes();
        let engine = DmEngine::new("alice".into(), alice);
        let (mut pending, _wire) = engine.prepare_send("bob", "hi", &bob_pk).unwrap();

        expire_if_due(&mut pending, pending.expires_ts + 1);
        assert_eq!(pending.status, DmStatus::Expired);
    }

    #[test]
    fn delivery_route_prefers_direct_then_dht_then_store_and_forward() {
        assert_eq!(choose_route(true, true), DeliveryRoute::DirectPeer);
        assert_eq!(choose_route(false, true), DeliveryRoute::DhtRouted);
        assert_eq!(choose_route(false, false), DeliveryRoute::StoreAndForward);
    }
}
