//! Keyspace prefixes: `spec.md` §6 "the storage surface is partitioned into
//! the following keyspaces".

pub const POSTS: &str = "posts/";
pub const IMAGE_CHUNKS: &str = "image_chunks/";
pub const USER_STATE: &str = "user_state/";
pub const PEER_SCORES: &str = "peer_scores/";
pub const DHT_ROUTING: &str = "dht_routing/";
pub const DHT_STORAGE: &str = "dht_storage/";
pub const PENDING_MESSAGES: &str = "pending_messages/";
pub const MESSAGE_RECEIPTS: &str = "message_receipts/";

/// Builds the composite key `keyspace ++ 0x00 ++ key` used inside the
/// single backing table.
pub fn composite_key(keyspace: &str, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keyspace.len() + 1 + key.len());
    out.extend_from_slice(keyspace.as_bytes());
    out.push(0u8);
    out.extend_from_slice(key);
    out
}

/// The half-open range `[prefix, prefix_upper_bound)` that covers every
/// composite key starting with `keyspace ++ 0x00 ++ prefix`.
pub fn prefix_bounds(keyspace: &str, prefix: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let lower = composite_key(keyspace, prefix);
    let mut upper = lower.clone();
    // Bump the last byte (carrying) to get an exclusive upper bound; if every
    // byte is 0xff, there is no finite upper bound short of the keyspace end.
    loop {
        match upper.pop() {
            Some(0xff) => continue,
            Some(b) => {
                upper.push(b + 1);
                break;
            }
            None => break,
        }
    }
    (lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_embeds_a_separator() {
        let k = composite_key(POSTS, b"abc");
        assert_eq!(k, b"posts/\x00abc".to_vec());
    }

    #[test]
    fn prefix_bounds_cover_the_prefix() {
        let (lower, upper) = prefix_bounds(POSTS, b"ab");
        assert!(lower < upper);
        assert!(composite_key(POSTS, b"ab0") < upper);
        assert!(composite_key(POSTS, b"ab0") >= lower);
        assert!(composite_key(POSTS, b"ac") >= upper);
    }
}
