//! Trust-based verification state machine for incoming posts: `spec.md`
//! §4.8 "Reception and trust-based verification".
//!
//! A pure `match`-based transition function, mirroring
//! `ember_identity::lifecycle`'s treatment of the claim lifecycle.

use std::time::Duration;

/// `spec.md` §4.8 step 3: "schedule trust evaluation every 100 ms for <= 10 s".
pub const EVALUATION_TICK: Duration = Duration::from_millis(100);
pub const MAX_PENDING_AGE_MS: i64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingPost {
    pub admitted_ms: i64,
    pub signature_checked: bool,
}

impl PendingPost {
    pub fn new(admitted_ms: i64) -> Self {
        Self {
            admitted_ms,
            signature_checked: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOutcome {
    /// Signature already failed on a prior tick; the post must be dropped.
    Drop,
    /// Trust score has cleared the threshold; accept without full VDF work.
    AcceptTrustShortcut,
    /// Grace period elapsed without enough attestation weight; hand off to
    /// the verifier pool for full VDF + signature verification.
    SubmitForVerification,
    /// Neither condition has fired yet; keep waiting for more attestations.
    KeepWaiting,
}

/// `spec.md` §4.8 step 4, evaluated once per tick.
///
/// `signature_ok` reflects the one-time self-signature check (step 4: "verify
/// the self-signature once"); once it has been performed the caller should
/// stop re-checking it on subsequent ticks regardless of the outcome here.
pub fn evaluate_tick(
    entry: &PendingPost,
    signature_ok: bool,
    trust_score: f64,
    trust_threshold: f64,
    now_ms: i64,
    post_timestamp: i64,
    attestation_timeout_ms: i64,
) -> PendingOutcome {
    if !signature_ok {
        return PendingOutcome::Drop;
    }
    if trust_score >= trust_threshold {
        return PendingOutcome::AcceptTrustShortcut;
    }
    if now_ms - post_timestamp >= attestation_timeout_ms {
        return PendingOutcome::SubmitForVerification;
    }
    PendingOutcome::KeepWaiting
}

/// `spec.md` §5 "Backpressure... new posts age in pending until slots free".
/// A post older than [`MAX_PENDING_AGE_MS`] without resolution is dropped
/// rather than held forever.
pub fn has_expired(entry: &PendingPost, now_ms: i64) -> bool {
    now_ms - entry.admitted_ms >= MAX_PENDING_AGE_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_signature_drops_regardless_of_trust() {
        let entry = PendingPost::new(0);
        let outcome = evaluate_tick(&entry, false, 10.0, 3.0, 100, 0, 5_000);
        assert_eq!(outcome, PendingOutcome::Drop);
    }

    #[test]
    fn trust_above_threshold_short_circuits() {
        let entry = PendingPost::new(0);
        let outcome = evaluate_tick(&entry, true, 3.5, 3.0, 100, 0, 5_000);
        assert_eq!(outcome, PendingOutcome::AcceptTrustShortcut);
    }

    #[test]
    fn timeout_without_trust_falls_back_to_full_verification() {
        let entry = PendingPost::new(0);
        let outcome = evaluate_tick(&entry, true, 0.0, 3.0, 6_000, 0, 5_000);
        assert_eq!(outcome, PendingOutcome::SubmitForVerification);
    }

    #[test]
    fn otherwise_keeps_waiting() {
        let entry = PendingPost::new(0);
        let outcome = evaluate_tick(&entry, true, 1.0, 3.0, 1_000, 0, 5_000);
        assert_eq!(outcome, PendingOutcome::KeepWaiting);
    }

    #[test]
    fn expires_after_ten_seconds() {
        let entry = PendingPost::new(0);
        assert!(!has_expired(&entry, 9_999));
        assert!(has_expired(&entry, 10_000));
    }
}
