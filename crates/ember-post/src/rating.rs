//! Vote aggregation: `spec.md` §4.8 "Rating".

use crate::error::PostError;
use ember_crypto::Verifier;
use ember_types::post::{Rating, Vote};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RatingTally {
    votes: HashMap<String, Vote>,
}

impl RatingTally {
    pub fn apply(&mut self, voter: String, vote: Vote) {
        self.votes.insert(voter, vote);
    }

    pub fn up_count(&self) -> usize {
        self.votes.values().filter(|v| **v == Vote::Up).count()
    }

    pub fn down_count(&self) -> usize {
        self.votes.values().filter(|v| **v == Vote::Down).count()
    }

    pub fn score(&self) -> i64 {
        self.up_count() as i64 - self.down_count() as i64
    }
}

/// Per-post rating tallies, keyed by post id.
#[derive(Default)]
pub struct RatingLedger {
    tallies: HashMap<[u8; 16], RatingTally>,
}

impl RatingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally_for(&self, post_id: &[u8; 16]) -> Option<&RatingTally> {
        self.tallies.get(post_id)
    }

    /// Local vote cast by this node's own user: `spec.md` §4.8 "On a user
    /// vote: update local aggregate (reject self-ratings)".
    pub fn cast_local_vote(&mut self, post_id: [u8; 16], post_author: &str, voter: &str, vote: Vote) -> Result<(), PostError> {
        if voter == post_author {
            return Err(PostError::SelfRating);
        }
        self.tallies.entry(post_id).or_default().apply(voter.to_string(), vote);
        Ok(())
    }

    /// Incoming `post_rating`: `spec.md` §4.8 "On reception: verify
    /// signature, discard if older than 5 minutes (replay), then apply."
    pub fn receive_rating(
        &mut self,
        rating: &Rating,
        post_author: &str,
        now_ms: i64,
        replay_window_ms: i64,
    ) -> Result<(), PostError> {
        if rating.voter == post_author {
            return Err(PostError::SelfRating);
        }
        if now_ms - rating.timestamp > replay_window_ms {
            return Err(PostError::StaleRating);
        }
        Verifier::verify(&rating.voter_pk, &rating.canonical_bytes(), &rating.signature)
            .map_err(|_| PostError::InvalidSignature)?;

        self.tallies
            .entry(rating.post_id)
            .or_default()
            .apply(rating.voter.clone(), rating.vote);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_crypto::{SignKeyPair, Signer};
    use ember_types::post::CanonicalRating;

    fn signed_rating(post_id: [u8; 16], voter: &str, vote: Vote, timestamp: i64, keypair: &SignKeyPair) -> Rating {
        let canonical = CanonicalRating { post_id, voter, vote, timestamp };
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        Rating {
            post_id,
            voter: voter.to_string(),
            vote,
            reputation: 1.0,
            timestamp,
            signature: keypair.sign(&bytes),
            voter_pk: keypair.public_key_bytes(),
        }
    }

    #[test]
    fn self_rating_is_rejected_locally() {
        let mut ledger = RatingLedger::new();
        let err = ledger.cast_local_vote([1u8; 16], "alice", "alice", Vote::Up).unwrap_err();
        assert_eq!(err, PostError::SelfRating);
    }

    #[test]
    fn local_votes_tally_correctly() {
        let mut ledger = RatingLedger::new();
        ledger.cast_local_vote([1u8; 16], "alice", "bob", Vote::Up).unwrap();
        ledger.cast_local_vote([1u8; 16], "alice", "carol", Vote::Down).unwrap();
        let tally = ledger.tally_for(&[1u8; 16]).unwrap();
        assert_eq!(tally.score(), 0);
    }

    #[test]
    fn received_rating_applies_after_verification() {
        let mut ledger = RatingLedger::new();
        let keypair = SignKeyPair::generate();
        let rating = signed_rating([2u8; 16], "bob", Vote::Up, 1_000, &keypair);
        ledger.receive_rating(&rating, "alice", 1_000, 300_000).unwrap();
        assert_eq!(ledger.tally_for(&[2u8; 16]).unwrap().up_count(), 1);
    }

    #[test]
    fn stale_rating_is_rejected() {
        let mut ledger = RatingLedger::new();
        let keypair = SignKeyPair::generate();
        let rating = signed_rating([2u8; 16], "bob", Vote::Up, 0, &keypair);
        let err = ledger.receive_rating(&rating, "alice", 400_000, 300_000).unwrap_err();
        assert_eq!(err, PostError::StaleRating);
    }

    #[test]
    fn tampered_rating_fails_signature_check() {
        let mut ledger = RatingLedger::new();
        let keypair = SignKeyPair::generate();
        let mut rating = signed_rating([2u8; 16], "bob", Vote::Up, 1_000, &keypair);
        rating.signature[0] ^= 0xFF;
        let err = ledger.receive_rating(&rating, "alice", 1_000, 300_000).unwrap_err();
        assert_eq!(err, PostError::InvalidSignature);
    }
}
