//! Attestation intake: `spec.md` §4.8 step 5.

use crate::error::PostError;
use ember_crypto::Verifier;
use ember_types::post::{Attestation, Post};

/// Applies an incoming `post_attestation` to `post`, per `spec.md` §4.8 step
/// 5: "an incoming `post_attestation` whose signature verifies, whose
/// attester's reputation exceeds a trust threshold, and whose `post_id`
/// matches a pending post contributes to that post's `trust_score`
/// additively by the attester's reputation, and adds `attester_handle` to
/// `post.attesters`."
///
/// Returns `Ok(true)` if the attestation was applied, `Ok(false)` if it was
/// silently ignored (reputation below threshold, or `post_id` mismatch).
pub fn apply_attestation(
    post: &mut Post,
    attestation: &Attestation,
    attester_reputation: f64,
    reputation_threshold: f64,
) -> Result<bool, PostError> {
    if attestation.post_id != post.id {
        return Ok(false);
    }
    Verifier::verify(
        &attestation.attester_pk,
        &attestation.canonical_bytes(),
        &attestation.signature,
    )
    .map_err(|_| PostError::InvalidSignature)?;

    if attester_reputation < reputation_threshold {
        return Ok(false);
    }

    post.trust_score += attester_reputation;
    post.attesters.insert(attestation.attester_handle.clone());
    Ok(true)
}

/// Builds this node's own attestation for a just-accepted post, signed by
/// the local key: `spec.md` §4.8 step 6 "Emit a fresh attestation signed by
/// this node and broadcast it."
pub fn build_attestation(
    post: &Post,
    attester_handle: &str,
    attester_pk: &[u8],
    sign: impl FnOnce(&[u8]) -> Vec<u8>,
) -> Attestation {
    let mut attestation = Attestation {
        post_id: post.id,
        post_author: post.author.clone(),
        timestamp: post.timestamp,
        vdf_iterations: post.vdf_proof.iterations,
        attester_handle: attester_handle.to_string(),
        attester_pk: attester_pk.to_vec(),
        signature: Vec::new(),
    };
    attestation.signature = sign(&attestation.canonical_bytes());
    attestation
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_crypto::{SignKeyPair, Signer};
    use ember_types::vdfproof::VdfProof;

    fn sample_post() -> Post {
        Post {
            id: [7u8; 16],
            author: "alice".into(),
            author_pk: vec![1, 2, 3],
            timestamp: 1_000,
            parent_id: None,
            content: "hi".into(),
            image_hash: None,
            image_meta: None,
            vdf_input: vec![],
            vdf_proof: VdfProof { y: vec![], pi: vec![], l: vec![], r: vec![], iterations: 256 },
            author_vdf_input: vec![],
            author_vdf_proof: VdfProof { y: vec![], pi: vec![], l: vec![], r: vec![], iterations: 256 },
            signature: vec![],
            carriers: Default::default(),
            replies: Default::default(),
            depth: 0,
            trust_score: 0.0,
            attesters: Default::default(),
            explicitly_carrying: false,
        }
    }

    #[test]
    fn reputable_attester_raises_trust_score() {
        let mut post = sample_post();
        let attester = SignKeyPair::generate();
        let attestation = build_attestation(&post, "bob", &attester.public_key_bytes(), |bytes| attester.sign(bytes));

        let applied = apply_attestation(&mut post, &attestation, 2.0, 1.0).unwrap();
        assert!(applied);
        assert_eq!(post.trust_score, 2.0);
        assert!(post.attesters.contains("bob"));
    }

    #[test]
    fn low_reputation_attester_is_ignored() {
        let mut post = sample_post();
        let attester = SignKeyPair::generate();
        let attestation = build_attestation(&post, "bob", &attester.public_key_bytes(), |bytes| attester.sign(bytes));

        let applied = apply_attestation(&mut post, &attestation, 0.1, 1.0).unwrap();
        assert!(!applied);
        assert_eq!(post.trust_score, 0.0);
    }

    #[test]
    fn forged_signature_is_rejected() {
        let mut post = sample_post();
        let real_attester = SignKeyPair::generate();
        let mut attestation =
            build_attestation(&post, "bob", &real_attester.public_key_bytes(), |bytes| real_attester.sign(bytes));
        attestation.signature[0] ^= 0xFF;

        assert_eq!(apply_attestation(&mut post, &attestation, 5.0, 1.0), Err(PostError::InvalidSignature));
    }

    #[test]
    fn mismatched_post_id_is_ignored() {
        let mut post = sample_post();
        let attester = SignKeyPair::generate();
        let mut attestation =
            build_attestation(&post, "bob", &attester.public_key_bytes(), |bytes| attester.sign(bytes));
        attestation.post_id = [9u8; 16];

        assert_eq!(apply_attestation(&mut post, &attestation, 5.0, 1.0), Ok(false));
    }
}
