//! Identity claims, confirmation slips, and the canonical forms they sign.
//!
//! See `spec.md` §3 "Identity" and "Confirmation slip", and §4.7 for the
//! admission protocol these types participate in.

use crate::b64;
use crate::vdfproof::VdfProof;
use serde::{Deserialize, Serialize};

/// Advisory per-device VDF calibration, recorded on the identity so peers can
/// sanity-check proof costs without recomputing them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Calibration {
    pub iterations_per_ms: f64,
    pub target_iterations: u64,
}

/// A handle claim: `spec.md` §3 "Identity".
///
/// `nodeId = SHA1(pk_sign)`; the self-signature covers the canonical form in
/// [`CanonicalIdentity`], *not* this struct directly (this struct also
/// carries `calibration`, which is advisory and unsigned).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub handle: String,
    #[serde(with = "b64::bytes")]
    pub pk_sign: Vec<u8>,
    #[serde(with = "b64::bytes")]
    pub pk_enc: Vec<u8>,
    #[serde(with = "b64::fixed20")]
    pub node_id: [u8; 20],
    #[serde(with = "b64::bytes")]
    pub vdf_input: Vec<u8>,
    pub vdf_proof: VdfProof,
    #[serde(with = "b64::bytes")]
    pub signature: Vec<u8>,
    pub calibration: Option<Calibration>,
}

/// The exact object whose canonical JSON bytes are signed by `pk_sign` to
/// produce `Identity::signature`. Field order is significant.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalIdentity<'a> {
    pub handle: &'a str,
    #[serde(with = "b64::bytes")]
    pub pk_sign: &'a [u8],
    pub vdf_proof: &'a VdfProof,
}

impl Identity {
    pub fn canonical(&self) -> CanonicalIdentity<'_> {
        CanonicalIdentity {
            handle: &self.handle,
            pk_sign: &self.pk_sign,
            vdf_proof: &self.vdf_proof,
        }
    }

    /// Canonical JSON bytes to sign/verify, per `spec.md` §4.2.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // serde_json preserves struct declaration order, which is the
        // canonical order required here.
        serde_json::to_vec(&self.canonical()).unwrap_or_default()
    }

    pub fn validate_handle(handle: &str) -> bool {
        let len_ok = (3..=32).contains(&handle.chars().count());
        len_ok
            && handle
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

/// A not-yet-promoted claim awaiting confirmation quorum: `spec.md` §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionalClaim {
    pub claim: Identity,
    pub confirmations: std::collections::BTreeSet<String>,
    pub first_seen_ms: i64,
}

/// Signed by an independent confirmer over `{handle, claim_hash}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSlip {
    pub handle: String,
    #[serde(with = "b64::fixed32")]
    pub claim_hash: [u8; 32],
    pub confirmer_handle: String,
    #[serde(with = "b64::bytes")]
    pub confirmer_pk: Vec<u8>,
    #[serde(with = "b64::bytes")]
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanonicalConfirmationSlip<'a> {
    pub handle: &'a str,
    #[serde(with = "b64::fixed32")]
    pub claim_hash: [u8; 32],
}

impl ConfirmationSlip {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let canonical = CanonicalConfirmationSlip {
            handle: &self.handle,
            claim_hash: self.claim_hash,
        };
        serde_json::to_vec(&canonical).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_validation_matches_spec_boundaries() {
        assert!(!Identity::validate_handle("ab"));
        assert!(Identity::validate_handle("abc"));
        assert!(!Identity::validate_handle("a@b"));
        assert!(Identity::validate_handle(&"a".repeat(32)));
        assert!(!Identity::validate_handle(&"a".repeat(33)));
    }

    #[test]
    fn canonical_identity_field_order_is_stable() {
        let id = Identity {
            handle: "alice".into(),
            pk_sign: vec![1, 2, 3],
            pk_enc: vec![4, 5, 6],
            node_id: [0u8; 20],
            vdf_input: vec![7, 8],
            vdf_proof: VdfProof {
                y: vec![1],
                pi: vec![2],
                l: vec![3],
                r: vec![4],
                iterations: 1000,
            },
            signature: vec![9, 9],
            calibration: None,
        };
        let bytes = id.canonical_bytes();
        let text = String::from_utf8(bytes).unwrap();
        let handle_pos = text.find("\"handle\"").unwrap();
        let pk_pos = text.find("\"pk_sign\"").unwrap();
        let vdf_pos = text.find("\"vdf_proof\"").unwrap();
        assert!(handle_pos < pk_pos && pk_pos < vdf_pos);
    }
}
