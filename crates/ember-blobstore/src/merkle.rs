//! Binary Merkle tree over chunk hashes: `spec.md` §4.3 "the binary-tree
//! hash over chunk hashes (odd sibling duplicated)".

use ember_crypto::sha256;

pub fn merkle_root(chunk_hashes: &[[u8; 32]]) -> [u8; 32] {
    if chunk_hashes.is_empty() {
        return sha256(&[]);
    }
    let mut level: Vec<[u8; 32]> = chunk_hashes.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            if let Some(last) = level.last().copied() {
                level.push(last);
            }
        }
        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            let (Some(left), Some(right)) = (pair.first(), pair.get(1)) else {
                continue;
            };
            let mut combined = Vec::with_capacity(64);
            combined.extend_from_slice(left);
            combined.extend_from_slice(right);
            next.push(sha256(&combined));
        }
        level = next;
    }
    level.into_iter().next().unwrap_or_else(|| sha256(&[]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_root_is_its_own_hash() {
        let h = sha256(b"chunk");
        assert_eq!(merkle_root(&[h]), h);
    }

    #[test]
    fn odd_count_duplicates_the_last_leaf() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        let c = sha256(b"c");
        let with_dup = merkle_root(&[a, b, c, c]);
        let without_dup = merkle_root(&[a, b, c]);
        assert_eq!(with_dup, without_dup);
    }

    #[test]
    fn two_chunks_hash_their_concatenation() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        let expected = sha256(&[a.as_slice(), b.as_slice()].concat());
        assert_eq!(merkle_root(&[a, b]), expected);
    }
}
