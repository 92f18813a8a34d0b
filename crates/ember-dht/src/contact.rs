//! Node identity and the XOR metric: `spec.md` §4.4 "160-bit, XOR metric".

pub type NodeId = [u8; 20];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeContact {
    pub node_id: NodeId,
    pub peer_addr: String,
}

/// Bytewise XOR; since `[u8; 20]` compares lexicographically, the result
/// orders the same way the big-endian unsigned integer distance would.
pub fn xor_distance(a: &NodeId, b: &NodeId) -> NodeId {
    let mut out = [0u8; 20];
    for i in 0..20 {
        if let (Some(oa), Some(ob)) = (a.get(i), b.get(i)) {
            if let Some(slot) = out.get_mut(i) {
                *slot = oa ^ ob;
            }
        }
    }
    out
}

/// Sorts `contacts` by ascending XOR distance from `target`, truncating to
/// at most `limit` entries.
pub fn k_closest(contacts: &mut Vec<NodeContact>, target: &NodeId, limit: usize) {
    contacts.sort_by_key(|c| xor_distance(&c.node_id, target));
    contacts.truncate(limit);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let id = [7u8; 20];
        assert_eq!(xor_distance(&id, &id), [0u8; 20]);
    }

    #[test]
    fn k_closest_sorts_ascending() {
        let target = [0u8; 20];
        let mut far = [0u8; 20];
        if let Some(b) = far.get_mut(0) {
            *b = 0xff;
        }
        let mut near = [0u8; 20];
        if let Some(b) = near.get_mut(19) {
            *b = 0x01;
        }
        let mut contacts = vec![
            NodeContact { node_id: far, peer_addr: "far".into() },
            NodeContact { node_id: near, peer_addr: "near".into() },
        ];
        k_closest(&mut contacts, &target, 2);
        assert_eq!(contacts[0].peer_addr, "near");
    }
}
