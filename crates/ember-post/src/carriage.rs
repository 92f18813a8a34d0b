//! Carriage (ephemerality) and per-thread garbage collection: `spec.md`
//! §4.8 "Carriage / ephemerality", "Garbage collection (periodic)".

use ember_types::post::Post;

const ONE_HOUR_MS: i64 = 60 * 60 * 1000;
const THIRTY_MIN_MS: i64 = 30 * 60 * 1000;

/// `toggle_carry(id)`: flips membership of `self_handle` in `post.carriers`
/// and updates `explicitly_carrying` to match. Returns the new carrying
/// state so the caller can broadcast `carrier_update`.
pub fn toggle_carry(post: &mut Post, self_handle: &str) -> bool {
    let now_carrying = if post.carriers.remove(self_handle) {
        false
    } else {
        post.carriers.insert(self_handle.to_string());
        true
    };
    post.explicitly_carrying = now_carrying;
    now_carrying
}

/// Applies an incoming `carrier_update`. Returns `true` if the post should
/// be dropped as a result (non-reply post whose carrier set just emptied).
pub fn apply_carrier_update(post: &mut Post, peer: &str, carrying: bool) -> bool {
    if carrying {
        post.carriers.insert(peer.to_string());
    } else {
        post.carriers.remove(peer);
    }
    post.carriers.is_empty() && !post.is_reply()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcOutcome {
    /// The thread is still wanted; no action.
    Keep,
    /// The lone remaining carrier should withdraw, which will in turn
    /// collapse the thread once the `carrier_update` propagates.
    SoleCarrierShouldWithdraw { carrier: String },
    /// Neither keep nor withdraw conditions are met yet (sole carrier but
    /// younger than 30 minutes); revisit on the next GC pass.
    NoAction,
}

/// `spec.md` §4.8 "Garbage collection (periodic)", evaluated over the set of
/// posts sharing a thread root.
pub fn evaluate_thread_gc(members: &[&Post], now_ms: i64) -> GcOutcome {
    let mut thread_carriers: Vec<&str> = Vec::new();
    let mut newest_ts = i64::MIN;
    let mut has_explicit = false;
    let mut has_replies = false;

    for post in members {
        for carrier in &post.carriers {
            if !thread_carriers.contains(&carrier.as_str()) {
                thread_carriers.push(carrier.as_str());
            }
        }
        newest_ts = newest_ts.max(post.timestamp);
        has_explicit |= post.explicitly_carrying;
        has_replies |= post.is_reply();
    }

    let age_ms = now_ms - newest_ts;
    if has_explicit || thread_carriers.len() > 2 || age_ms < ONE_HOUR_MS || has_replies {
        return GcOutcome::Keep;
    }

    if thread_carriers.len() == 1 && age_ms > THIRTY_MIN_MS {
        if let Some(carrier) = thread_carriers.first() {
            return GcOutcome::SoleCarrierShouldWithdraw {
                carrier: carrier.to_string(),
            };
        }
    }
    GcOutcome::NoAction
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_types::VdfProof;

    fn post_with(id: u8, carriers: &[&str], timestamp: i64, explicit: bool, is_reply: bool) -> Post {
        Post {
            id: [id; 16],
            author: "alice".into(),
            author_pk: vec![],
            timestamp,
            parent_id: if is_reply { Some([1u8; 16]) } else { None },
            content: "x".into(),
            image_hash: None,
            image_meta: None,
            vdf_input: vec![],
            vdf_proof: VdfProof { y: vec![], pi: vec![], l: vec![], r: vec![], iterations: 1 },
            author_vdf_input: vec![],
            author_vdf_proof: VdfProof { y: vec![], pi: vec![], l: vec![], r: vec![], iterations: 1 },
            signature: vec![],
            carriers: carriers.iter().map(|s| s.to_string()).collect(),
            replies: Default::default(),
            depth: 0,
            trust_score: 0.0,
            attesters: Default::default(),
            explicitly_carrying: explicit,
        }
    }

    #[test]
    fn toggle_carry_flips_membership() {
        let mut post = post_with(1, &[], 0, false, false);
        assert!(toggle_carry(&mut post, "alice"));
        assert!(post.carriers.contains("alice"));
        assert!(!toggle_carry(&mut post, "alice"));
        assert!(!post.carriers.contains("alice"));
    }

    #[test]
    fn non_reply_post_with_no_carriers_left_should_drop() {
        let mut post = post_with(1, &["alice"], 0, false, false);
        assert!(apply_carrier_update(&mut post, "alice", false));
    }

    #[test]
    fn reply_post_survives_empty_carrier_set() {
        let mut post = post_with(1, &["alice"], 0, false, true);
        assert!(!apply_carrier_update(&mut post, "alice", false));
    }

    #[test]
    fn fresh_thread_is_kept_regardless_of_carrier_count() {
        let post = post_with(1, &["alice"], 0, false, false);
        let members = vec![&post];
        assert_eq!(evaluate_thread_gc(&members, 100), GcOutcome::Keep);
    }

    #[test]
    fn old_sole_carrier_thread_should_withdraw() {
        let post = post_with(1, &["alice"], 0, false, false);
        let members = vec![&post];
        let outcome = evaluate_thread_gc(&members, THIRTY_MIN_MS + 1);
        assert_eq!(outcome, GcOutcome::SoleCarrierShouldWithdraw { carrier: "alice".to_string() });
    }

    #[test]
    fn thread_with_replies_is_always_kept() {
        let root = post_with(1, &["alice"], 0, false, false);
        let reply = post_with(2, &["alice"], 0, false, true);
        let members = vec![&root, &reply];
        assert_eq!(evaluate_thread_gc(&members, ONE_HOUR_MS * 10), GcOutcome::Keep);
    }
}
