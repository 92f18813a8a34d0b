//! `spec.md` §4.6: Scribe tree join/leave propagation plus Plumtree
//! eager/lazy message dissemination, graft/prune.

use crate::tree::TreeState;
use ember_types::wire::WireMessage;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// `spec.md` §9.R-equivalent: "Timers for Plumtree `graft` scheduling use
/// `tokio::time::sleep` tasks that post a result back to the main loop via
/// channel" — this engine only decides *that* a timer is needed and for how
/// long; the main loop owns the actual sleep.
pub const GRAFT_TIMEOUT: Duration = Duration::from_millis(500);

pub enum MulticastAction {
    Send { to: String, message: WireMessage },
    ScheduleGraftTimer { topic: String, msg_id: String, peer: String, after: Duration },
}

#[derive(Default)]
pub struct MulticastEngine {
    trees: HashMap<String, TreeState>,
}

impl MulticastEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree_mut(&mut self, topic: &str) -> &mut TreeState {
        self.trees.entry(topic.to_string()).or_default()
    }

    /// Local subscription intent. The caller (`ember-node`) still must route
    /// a `SUBSCRIBE` toward `root(topic)` via the DHT; this just marks local
    /// interest and reports whether the tree was newly entered.
    pub fn subscribe(&mut self, topic: &str) -> bool {
        let tree = self.tree_mut(topic);
        let was_in_tree = tree.is_in_tree();
        tree.subscribed_locally = true;
        !was_in_tree
    }

    pub fn unsubscribe(&mut self, topic: &str) -> bool {
        let tree = self.tree_mut(topic);
        tree.subscribed_locally = false;
        !tree.is_in_tree()
    }

    /// `spec.md` §4.6 "each hop recording the sender as a child". Returns
    /// `true` if this node newly entered the tree and must itself forward
    /// `SUBSCRIBE` upstream.
    pub fn handle_subscribe(&mut self, topic: &str, from_peer: String) -> bool {
        let tree = self.tree_mut(topic);
        let was_in_tree = tree.is_in_tree();
        tree.children.insert(from_peer.clone());
        tree.eager.insert(from_peer);
        !was_in_tree
    }

    /// Returns `true` if this node fell out of the tree and should forward
    /// `UNSUBSCRIBE` upstream.
    pub fn handle_unsubscribe(&mut self, topic: &str, from_peer: &str) -> bool {
        let tree = self.tree_mut(topic);
        tree.children.remove(from_peer);
        tree.eager.remove(from_peer);
        tree.lazy.remove(from_peer);
        !tree.is_in_tree()
    }

    /// Originates (or re-disseminates) a multicast for `topic`: marks the
    /// message seen, fans it out eagerly, and advertises it lazily.
    pub fn multicast(&mut self, topic: &str, msg_id: String, payload: Vec<u8>, from_peer: Option<&str>) -> Vec<MulticastAction> {
        let tree = self.tree_mut(topic);
        if tree.seen.contains(&msg_id) {
            return Vec::new();
        }
        tree.seen.put(msg_id.clone(), ());
        tree.cached_payloads.put(msg_id.clone(), payload.clone());

        let mut actions = Vec::new();
        for peer in tree.eager.iter().filter(|p| Some(p.as_str()) != from_peer) {
            actions.push(MulticastAction::Send {
                to: peer.clone(),
                message: WireMessage::Multicast {
                    topic: topic.to_string(),
                    msg_id: msg_id.clone(),
                    payload: payload.clone(),
                },
            });
        }
        for peer in tree.lazy.iter().filter(|p| Some(p.as_str()) != from_peer) {
            actions.push(MulticastAction::Send {
                to: peer.clone(),
                message: WireMessage::IHave { topic: topic.to_string(), msg_id: msg_id.clone() },
            });
        }
        actions
    }

    /// `spec.md` §4.6 "Duplicates on eager edges cause a `prune`, moving the
    /// peer to lazy."
    pub fn receive_multicast(&mut self, topic: &str, msg_id: String, payload: Vec<u8>, from_peer: String) -> Vec<MulticastAction> {
        let already_seen = self.tree_mut(topic).seen.contains(&msg_id);
        if already_seen {
            self.demote_to_lazy(topic, &from_peer);
            return vec![MulticastAction::Send {
                to: from_peer,
                message: WireMessage::Prune { topic: topic.to_string() },
            }];
        }
        self.promote_to_eager(topic, &from_peer);
        self.multicast(topic, msg_id, payload, Some(&from_peer))
    }

    /// `spec.md` §4.6 "On receipt of a lazy hash for an unseen message,
    /// schedule a timer."
    pub fn receive_ihave(&mut self, topic: &str, msg_id: String, from_peer: String) -> Option<MulticastAction> {
        if self.tree_mut(topic).seen.contains(&msg_id) {
            return None;
        }
        Some(MulticastAction::ScheduleGraftTimer {
            topic: topic.to_string(),
            msg_id,
            peer: from_peer,
            after: GRAFT_TIMEOUT,
        })
    }

    /// Fired by the main loop when a scheduled graft timer expires and the
    /// message still hasn't arrived.
    pub fn graft_timer_fired(&mut self, topic: &str, msg_id: String, peer: String) -> Option<MulticastAction> {
        if self.tree_mut(topic).seen.contains(&msg_id) {
            return None;
        }
        self.promote_to_eager(topic, &peer);
        Some(MulticastAction::Send {
            to: peer,
            message: WireMessage::Graft { topic: topic.to_string(), msg_id },
        })
    }

    /// "On expiry, send a `graft` request to promote that peer back to
    /// eager and fetch the missing message." This handles the receiving
    /// side: resend the cached payload if we have it.
    pub fn receive_graft(&mut self, topic: &str, msg_id: &str, from_peer: String) -> Vec<MulticastAction> {
        self.promote_to_eager(topic, &from_peer);
        let tree = self.tree_mut(topic);
        match tree.cached_payloads.get(msg_id).cloned() {
            Some(payload) => vec![MulticastAction::Send {
                to: from_peer,
                message: WireMessage::Multicast { topic: topic.to_string(), msg_id: msg_id.to_string(), payload },
            }],
            None => {
                debug!(topic, msg_id, "graft requested for a message we no longer hold");
                Vec::new()
            }
        }
    }

    pub fn receive_prune(&mut self, topic: &str, from_peer: &str) {
        self.demote_to_lazy(topic, from_peer);
    }

    fn promote_to_eager(&mut self, topic: &str, peer: &str) {
        let tree = self.tree_mut(topic);
        tree.lazy.remove(peer);
        tree.eager.insert(peer.to_string());
    }

    fn demote_to_lazy(&mut self, topic: &str, peer: &str) {
        let tree = self.tree_mut(topic);
        tree.eager.remove(peer);
        tree.lazy.insert(peer.to_string());
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.trees.get(topic).map(|t| t.subscribed_locally).unwrap_or(false)
    }

    pub fn children(&self, topic: &str) -> Vec<String> {
        self.trees.get(topic).map(|t| t.children.iter().cloned().collect()).unwrap_or_default()
    }
}
