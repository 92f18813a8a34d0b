//! `spec.md` §4.7 identity registry: provisional claim tracking,
//! confirmation-slip quorum, and the confirmed-identity cache.

use crate::error::IdentityError;
use crate::lifecycle::PROVISIONAL_TTL_MS;
use ember_crypto::{sha256, Verifier};
use ember_types::identity::{ConfirmationSlip, Identity, ProvisionalClaim};
use ember_types::time::now_ms;
use std::collections::HashMap;
use tracing::{debug, warn};

/// `spec.md` §6 `IDENTITY_CONFIRMATION_THRESHOLD`, default 3.
pub const DEFAULT_QUORUM: usize = 3;

pub struct IdentityRegistry {
    confirmed: HashMap<String, Identity>,
    by_pubkey: HashMap<Vec<u8>, String>,
    provisional: HashMap<String, ProvisionalClaim>,
    quorum: usize,
}

impl IdentityRegistry {
    pub fn new(quorum: usize) -> Self {
        Self {
            confirmed: HashMap::new(),
            by_pubkey: HashMap::new(),
            provisional: HashMap::new(),
            quorum,
        }
    }

    pub fn resolve(&self, handle: &str) -> Option<&Identity> {
        self.confirmed.get(handle)
    }

    pub fn resolve_by_pubkey(&self, pk_sign: &[u8]) -> Option<&Identity> {
        self.by_pubkey.get(pk_sign).and_then(|h| self.confirmed.get(h))
    }

    pub fn is_confirmed(&self, handle: &str) -> bool {
        self.confirmed.contains_key(handle)
    }

    pub fn provisional_for(&self, handle: &str) -> Option<&ProvisionalClaim> {
        self.provisional.get(handle)
    }

    /// `spec.md` §4.2 `claim_hash`es bind a confirmer's slip to a specific
    /// claim instance.
    pub fn claim_hash(claim: &Identity) -> [u8; 32] {
        sha256(&claim.canonical_bytes())
    }

    /// Local, synchronous half of `spec.md` §4.7 step 2: format, duplicate,
    /// VDF, and signature checks. The caller still owns the DHT conflict
    /// check (step 2's "rejects if handle already resolves... in the DHT").
    pub fn validate_claim(&self, claim: &Identity) -> Result<(), IdentityError> {
        if !Identity::validate_handle(&claim.handle) {
            return Err(IdentityError::InvalidHandle);
        }
        if self.confirmed.contains_key(&claim.handle) {
            return Err(IdentityError::DuplicateClaim);
        }
        if self.provisional.contains_key(&claim.handle) {
            return Err(IdentityError::DuplicateClaim);
        }
        if !ember_vdf::verify(&claim.vdf_input, &claim.vdf_proof) {
            return Err(IdentityError::InvalidVdf);
        }
        Verifier::verify(&claim.pk_sign, &claim.canonical_bytes(), &claim.signature)
            .map_err(|_| IdentityError::InvalidSignature)?;
        Ok(())
    }

    pub fn record_provisional(&mut self, claim: Identity) {
        let handle = claim.handle.clone();
        self.provisional.insert(
            handle,
            ProvisionalClaim {
                claim,
                confirmations: Default::default(),
                first_seen_ms: now_ms(),
            },
        );
    }

    /// `spec.md` §4.7 step 3: "collects unique slips... When `|slips| >= Q`
    /// and each slip verifies... stored." Returns `true` once quorum is
    /// reached on this call (the caller is then responsible for the DHT
    /// store and for calling [`Self::promote`]).
    pub fn add_confirmation(&mut self, slip: &ConfirmationSlip) -> Result<bool, IdentityError> {
        Verifier::verify(&slip.confirmer_pk, &slip.canonical_bytes(), &slip.signature)
            .map_err(|_| IdentityError::InvalidSignature)?;

        let entry = self.provisional.get_mut(&slip.handle).ok_or(IdentityError::NotFound)?;
        let expected_hash = sha256(&entry.claim.canonical_bytes());
        if expected_hash != slip.claim_hash {
            return Err(IdentityError::ClaimHashMismatch);
        }
        entry.confirmations.insert(slip.confirmer_handle.clone());
        let reached = entry.confirmations.len() >= self.quorum;
        debug!(handle = %slip.handle, confirmations = entry.confirmations.len(), "recorded identity confirmation slip");
        Ok(reached)
    }

    /// Moves a provisional claim that reached quorum into the confirmed
    /// cache. Idempotent: confirming an already-confirmed handle is a no-op.
    pub fn promote(&mut self, handle: &str) -> Result<Identity, IdentityError> {
        if let Some(existing) = self.confirmed.get(handle) {
            return Ok(existing.clone());
        }
        let entry = self.provisional.remove(handle).ok_or(IdentityError::NotFound)?;
        self.by_pubkey.insert(entry.claim.pk_sign.clone(), handle.to_string());
        self.confirmed.insert(handle.to_string(), entry.claim.clone());
        Ok(entry.claim)
    }

    /// Inserts an identity resolved directly from the DHT (another node's
    /// already-promoted claim), bypassing the local quorum flow.
    pub fn adopt_confirmed(&mut self, identity: Identity) {
        self.by_pubkey.insert(identity.pk_sign.clone(), identity.handle.clone());
        self.confirmed.insert(identity.handle.clone(), identity);
    }

    /// `spec.md` §4.7: "provisional entries have a TTL of 24 hours and are
    /// GC'd."
    pub fn gc_expired(&mut self) {
        let now = now_ms();
        let before = self.provisional.len();
        self.provisional.retain(|_, claim| now - claim.first_seen_ms < PROVISIONAL_TTL_MS);
        let removed = before - self.provisional.len();
        if removed > 0 {
            warn!(removed, "garbage collected expired provisional identity claims");
        }
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_crypto::{SignKeyPair, Signer};
    use ember_types::identity::{CanonicalConfirmationSlip, Calibration};
    use ember_types::vdfproof::VdfProof;

    fn sample_claim(handle: &str, keypair: &SignKeyPair) -> Identity {
        let vdf_input = format!("{handle}-input").into_bytes();
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        let (proof, _handle_) = rt
            .block_on(ember_vdf::compute(vdf_input.clone(), 128, std::time::Duration::from_secs(5)))
            .expect("vdf compute");
        let mut claim = Identity {
            handle: handle.to_string(),
            pk_sign: keypair.public_key_bytes(),
            pk_enc: vec![1, 2, 3],
            node_id: ember_crypto::node_id_from_pk(&keypair.public_key_bytes()),
            vdf_input,
            vdf_proof: proof,
            signature: Vec::new(),
            calibration: Some(Calibration { iterations_per_ms: 10.0, target_iterations: 128 }),
        };
        claim.signature = keypair.sign(&claim.canonical_bytes());
        claim
    }

    fn confirmation_for(claim: &Identity, confirmer: &SignKeyPair, confirmer_handle: &str) -> ConfirmationSlip {
        let claim_hash = IdentityRegistry::claim_hash(claim);
        let canonical = CanonicalConfirmationSlip { handle: &claim.handle, claim_hash };
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        ConfirmationSlip {
            handle: claim.handle.clone(),
            claim_hash,
            confirmer_handle: confirmer_handle.to_string(),
            confirmer_pk: confirmer.public_key_bytes(),
            signature: confirmer.sign(&bytes),
        }
    }

    #[test]
    fn valid_claim_passes_validation() {
        let keypair = SignKeyPair::generate();
        let claim = sample_claim("alice", &keypair);
        let registry = IdentityRegistry::new(DEFAULT_QUORUM);
        assert!(registry.validate_claim(&claim).is_ok());
    }

    #[test]
    fn invalid_handle_is_rejected() {
        let keypair = SignKeyPair::generate();
        let claim = sample_claim("ab", &keypair);
        let registry = IdentityRegistry::new(DEFAULT_QUORUM);
        assert_eq!(registry.validate_claim(&claim), Err(IdentityError::InvalidHandle));
    }

    #[test]
    fn quorum_of_three_promotes_identity() {
        let keypair = SignKeyPair::generate();
        let claim = sample_claim("alice", &keypair);
        let mut registry = IdentityRegistry::new(3);
        registry.record_provisional(claim.clone());

        let mut reached = false;
        for i in 0..3 {
            let confirmer = SignKeyPair::generate();
            let slip = confirmation_for(&claim, &confirmer, &format!("confirmer-{i}"));
            reached = registry.add_confirmation(&slip).unwrap();
        }
        assert!(reached);
        let promoted = registry.promote("alice").unwrap();
        assert_eq!(promoted.handle, "alice");
        assert!(registry.is_confirmed("alice"));
    }

    #[test]
    fn duplicate_claim_for_confirmed_handle_is_rejected() {
        let keypair = SignKeyPair::generate();
        let claim = sample_claim("alice", &keypair);
        let mut registry = IdentityRegistry::new(1);
        registry.record_provisional(claim.clone());
        let confirmer = SignKeyPair::generate();
        let slip = confirmation_for(&claim, &confirmer, "confirmer-0");
        registry.add_confirmation(&slip).unwrap();
        registry.promote("alice").unwrap();

        let second = sample_claim("alice", &SignKeyPair::generate());
        assert_eq!(registry.validate_claim(&second), Err(IdentityError::DuplicateClaim));
    }
}
