//! `spec.md` §4.5 HyParView-style overlay membership: active view for
//! broadcast, passive view as a repair reserve, join propagation via
//! `FORWARD_JOIN`, and periodic shuffles.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_ACTIVE_VIEW: usize = 5;
pub const DEFAULT_PASSIVE_VIEW: usize = 30;
/// Time-to-live a `FORWARD_JOIN` is seeded with; matches the active view
/// size, the conventional HyParView choice (ARWL).
const FORWARD_JOIN_TTL: u8 = DEFAULT_ACTIVE_VIEW as u8;
const SHUFFLE_SAMPLE_SIZE: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayMessage {
    Join { joiner: String },
    ForwardJoin { joiner: String, ttl: u8 },
    Disconnect { peer: String },
    Neighbor { peer: String },
    Shuffle { sender: String, peers: Vec<String> },
    ShuffleReply { peers: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayAction {
    /// Open a transport connection to `peer` (it just entered the active view).
    Connect { peer: String },
    /// Tear down the transport connection to `peer` (it left the active view).
    Disconnect { peer: String },
    /// Send `message` to `to` over whatever connection already exists.
    Send { to: String, message: OverlayMessage },
}

pub struct HyParView {
    local_id: String,
    active: Vec<String>,
    passive: Vec<String>,
    active_cap: usize,
    passive_cap: usize,
}

impl HyParView {
    pub fn new(local_id: String) -> Self {
        Self::with_caps(local_id, DEFAULT_ACTIVE_VIEW, DEFAULT_PASSIVE_VIEW)
    }

    pub fn with_caps(local_id: String, active_cap: usize, passive_cap: usize) -> Self {
        Self {
            local_id,
            active: Vec::new(),
            passive: Vec::new(),
            active_cap,
            passive_cap,
        }
    }

    pub fn active_view(&self) -> &[String] {
        &self.active
    }

    pub fn passive_view(&self) -> &[String] {
        &self.passive
    }

    fn demote_oldest_active(&mut self) -> Vec<OverlayAction> {
        if self.active.len() < self.active_cap {
            return Vec::new();
        }
        let evicted = self.active.remove(0);
        self.add_passive(evicted.clone());
        vec![OverlayAction::Disconnect { peer: evicted }]
    }

    fn promote_to_active(&mut self, peer: String) -> Vec<OverlayAction> {
        if self.active.contains(&peer) || peer == self.local_id {
            return Vec::new();
        }
        self.passive.retain(|p| p != &peer);
        let mut actions = self.demote_oldest_active();
        self.active.push(peer.clone());
        actions.push(OverlayAction::Connect { peer });
        actions
    }

    fn add_passive(&mut self, peer: String) {
        if peer == self.local_id || self.active.contains(&peer) || self.passive.contains(&peer) {
            return;
        }
        if self.passive.len() >= self.passive_cap {
            let mut rng = rand::thread_rng();
            if let Some(victim_idx) = (0..self.passive.len()).collect::<Vec<_>>().choose(&mut rng).copied() {
                self.passive.remove(victim_idx);
            }
        }
        self.passive.push(peer);
    }

    /// `spec.md` §4.5 "contact a bootstrap peer, send JOIN".
    pub fn join(&mut self, bootstrap: String) -> Vec<OverlayAction> {
        let mut actions = self.promote_to_active(bootstrap.clone());
        actions.push(OverlayAction::Send {
            to: bootstrap,
            message: OverlayMessage::Join { joiner: self.local_id.clone() },
        });
        actions
    }

    /// Bootstrap-side handling of an incoming `JOIN`: admits the joiner and
    /// forwards `FORWARD_JOIN` through the rest of the active view.
    pub fn handle_join(&mut self, joiner: String) -> Vec<OverlayAction> {
        let neighbors: Vec<String> = self.active.iter().filter(|p| **p != joiner).cloned().collect();
        let mut actions = self.promote_to_active(joiner.clone());
        for neighbor in neighbors {
            actions.push(OverlayAction::Send {
                to: neighbor,
                message: OverlayMessage::ForwardJoin {
                    joiner: joiner.clone(),
                    ttl: FORWARD_JOIN_TTL,
                },
            });
        }
        actions
    }

    /// `spec.md` §4.5 "bootstrap issues `FORWARD_JOIN` with TTL through
    /// active neighbors; a recipient at TTL 0 or by probability promotes
    /// the joiner."
    pub fn handle_forward_join(&mut self, sender: String, joiner: String, ttl: u8) -> Vec<OverlayAction> {
        if joiner == self.local_id {
            return Vec::new();
        }
        let should_promote = ttl == 0 || self.active.len() < self.active_cap;
        if should_promote {
            let mut actions = self.promote_to_active(joiner.clone());
            actions.push(OverlayAction::Send {
                to: joiner,
                message: OverlayMessage::Neighbor { peer: self.local_id.clone() },
            });
            return actions;
        }
        self.add_passive(joiner.clone());
        let next_hop = self
            .active
            .iter()
            .filter(|p| **p != sender && **p != joiner)
            .collect::<Vec<_>>()
            .choose(&mut rand::thread_rng())
            .map(|s| s.to_string());
        match next_hop {
            Some(hop) => vec![OverlayAction::Send {
                to: hop,
                message: OverlayMessage::ForwardJoin { joiner, ttl: ttl.saturating_sub(1) },
            }],
            None => self.promote_to_active(joiner),
        }
    }

    /// `spec.md` §4.5 "connection loss demotes the peer"; a random passive
    /// peer is promoted to keep the active view full.
    pub fn handle_disconnect(&mut self, peer: &str) -> Vec<OverlayAction> {
        self.active.retain(|p| p != peer);
        debug!(peer, "overlay peer disconnected");
        if let Some(replacement) = self.passive.choose(&mut rand::thread_rng()).cloned() {
            self.promote_to_active(replacement)
        } else {
            Vec::new()
        }
    }

    /// `spec.md` §4.5 "membership runs a peer-exchange every minute with a
    /// random active peer to refill the passive view."
    pub fn shuffle_tick(&mut self) -> Option<OverlayAction> {
        let target = self.active.choose(&mut rand::thread_rng()).cloned()?;
        let mut pool: Vec<String> = self.active.iter().chain(self.passive.iter()).filter(|p| **p != target).cloned().collect();
        pool.shuffle(&mut rand::thread_rng());
        pool.truncate(SHUFFLE_SAMPLE_SIZE);
        Some(OverlayAction::Send {
            to: target,
            message: OverlayMessage::Shuffle { sender: self.local_id.clone(), peers: pool },
        })
    }

    pub fn handle_shuffle(&mut self, sender: String, peers: Vec<String>) -> Vec<OverlayAction> {
        for peer in &peers {
            self.add_passive(peer.clone());
        }
        let mut reply_pool: Vec<String> = self.active.iter().chain(self.passive.iter()).cloned().collect();
        reply_pool.shuffle(&mut rand::thread_rng());
        reply_pool.truncate(SHUFFLE_SAMPLE_SIZE);
        vec![OverlayAction::Send {
            to: sender,
            message: OverlayMessage::ShuffleReply { peers: reply_pool },
        }]
    }

    pub fn handle_shuffle_reply(&mut self, peers: Vec<String>) {
        for peer in peers {
            self.add_passive(peer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_connects_to_bootstrap_directly() {
        let mut view = HyParView::new("local".into());
        let actions = view.join("bootstrap".into());
        assert!(view.active_view().contains(&"bootstrap".to_string()));
        assert!(actions.iter().any(|a| matches!(a, OverlayAction::Connect { peer } if peer == "bootstrap")));
    }

    #[test]
    fn handle_join_forwards_to_other_active_neighbors() {
        let mut view = HyParView::new("bootstrap".into());
        view.promote_to_active("existing".into());
        let actions = view.handle_join("newcomer".into());
        assert!(view.active_view().contains(&"newcomer".to_string()));
        assert!(actions.iter().any(|a| matches!(
            a,
            OverlayAction::Send { to, message: OverlayMessage::ForwardJoin { .. } } if to == "existing"
        )));
    }

    #[test]
    fn forward_join_at_ttl_zero_promotes_unconditionally() {
        let mut view = HyParView::with_caps("local".into(), 1, 30);
        view.promote_to_active("already-full".into());
        let actions = view.handle_forward_join("sender".into(), "joiner".into(), 0);
        assert!(view.active_view().contains(&"joiner".to_string()));
        assert!(!actions.is_empty());
    }

    #[test]
    fn disconnect_promotes_from_passive_view() {
        let mut view = HyParView::with_caps("local".into(), 1, 30);
        view.promote_to_active("a".into());
        view.add_passive("b".into());
        view.handle_disconnect("a");
        assert!(!view.active_view().contains(&"a".to_string()));
        assert!(view.active_view().contains(&"b".to_string()));
    }

    #[test]
    fn passive_view_never_exceeds_its_cap() {
        let mut view = HyParView::with_caps("local".into(), 5, 2);
        for i in 0..10 {
            view.add_passive(format!("peer-{i}"));
        }
        assert!(view.passive_view().len() <= 2);
    }
}
