//! Builds the signed, VDF-bound artifacts the identity admission protocol
//! exchanges: `spec.md` §4.7 step 1's claim and step 2's confirmation slip.
//! Kept as free functions over `ember-identity`/`ember-crypto` types rather
//! than methods on `Core`, matching `ember-post::compose`'s shape.

use ember_crypto::sha1_20;
use ember_crypto::{SignKeyPair, Verifier};
use ember_identity::IdentityRegistry;
use ember_types::identity::{Calibration, CanonicalConfirmationSlip, ConfirmationSlip, Identity};
use ember_vdf::wesolowski::DEFAULT_DEADLINE;
use tracing::debug;

/// Target VDF duration for an identity claim; heavier than a post's
/// adaptive-cost proof since Sybil resistance is a one-time cost paid once
/// per handle rather than once per message.
const IDENTITY_VDF_TARGET_MS: u64 = 2_000;

/// `vdf_input` for an identity claim: "a short random string bound to this
/// identity" (`spec.md` §3); realized as `handle || random 16 bytes`, the
/// same shape `ember_identity`'s own tests use.
fn claim_vdf_input(handle: &str) -> Vec<u8> {
    let mut input = handle.as_bytes().to_vec();
    let nonce: [u8; 16] = rand::random();
    input.extend_from_slice(&nonce);
    input
}

/// `spec.md` §4.7 step 1: produces a signed, VDF-proved claim ready to
/// broadcast as a `provisional_identity_claim`.
pub async fn build_claim(
    handle: String,
    sign_keypair: &SignKeyPair,
    pk_enc: Vec<u8>,
    calibration: Option<Calibration>,
) -> Result<Identity, ember_vdf::VdfError> {
    let vdf_input = claim_vdf_input(&handle);
    let iterations = ember_vdf::estimate_iterations_for_ms(IDENTITY_VDF_TARGET_MS, calibration.as_ref());
    debug!(handle = %handle, iterations, "computing identity claim vdf proof");
    let (vdf_proof, _handle) = ember_vdf::compute(vdf_input.clone(), iterations, DEFAULT_DEADLINE).await?;

    let pk_sign = sign_keypair.public_key_bytes();
    let node_id = sha1_20(&pk_sign);

    let mut claim = Identity {
        handle,
        pk_sign,
        pk_enc,
        node_id,
        vdf_input,
        vdf_proof,
        signature: Vec::new(),
        calibration,
    };
    claim.signature = sign_keypair.sign(&claim.canonical_bytes());
    Ok(claim)
}

/// `spec.md` §4.7 step 2's `confirmation_slip`, produced by a peer that has
/// independently validated `claim` and wishes to vouch for it.
pub fn build_confirmation_slip(claim: &Identity, confirmer_handle: &str, confirmer: &SignKeyPair) -> ConfirmationSlip {
    let claim_hash = IdentityRegistry::claim_hash(claim);
    let canonical = CanonicalConfirmationSlip {
        handle: &claim.handle,
        claim_hash,
    };
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    ConfirmationSlip {
        handle: claim.handle.clone(),
        claim_hash,
        confirmer_handle: confirmer_handle.to_string(),
        confirmer_pk: confirmer.public_key_bytes(),
        signature: confirmer.sign(&bytes),
    }
}

/// Verifies a claim's self-signature independent of the registry's fuller
/// `validate_claim` (which also checks handle format/duplicates): used when
/// re-checking a claim resolved directly from the DHT.
pub fn claim_signature_is_valid(claim: &Identity) -> bool {
    Verifier::verify(&claim.pk_sign, &claim.canonical_bytes(), &claim.signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_a_self_consistent_claim() {
        let keypair = SignKeyPair::generate();
        let claim = build_claim("alice".into(), &keypair, vec![1, 2, 3], None).await.unwrap();
        assert_eq!(claim.handle, "alice");
        assert_eq!(claim.node_id, sha1_20(&claim.pk_sign));
        assert!(claim_signature_is_valid(&claim));
        assert!(ember_vdf::verify(&claim.vdf_input, &claim.vdf_proof));
    }

    #[tokio::test]
    async fn confirmation_slip_verifies_under_confirmer_key() {
        let claimant = SignKeyPair::generate();
        let claim = build_claim("bob".into(), &claimant, vec![], None).await.unwrap();
        let confirmer = SignKeyPair::generate();
        let slip = build_confirmation_slip(&claim, "carol", &confirmer);
        Verifier::verify(&slip.confirmer_pk, &slip.canonical_bytes(), &slip.signature).unwrap();
    }
}
