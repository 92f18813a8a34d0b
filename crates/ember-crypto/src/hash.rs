//! SHA-1/SHA-256 helpers: `spec.md` §3 "nodeId = SHA1(pk_sign)",
//! §3 "Blob" integrity, §4.7 "claim_hash = SHA-256 ... of the claim's
//! canonical form".

use sha1::Sha1;
use sha2::{Digest, Sha256};

pub fn node_id_from_pk(pk_sign: &[u8]) -> [u8; 20] {
    sha1_20(pk_sign)
}

/// `SHA1(bytes)`, used for `nodeId` derivation (`spec.md` §3) and for
/// mapping arbitrary DHT keys into the 160-bit keyspace (§4.4).
pub fn sha1_20(bytes: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut id = [0u8; 20];
    id.copy_from_slice(&out);
    id
}

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&out);
    digest
}

pub fn sha256_concat(chunks: &[Vec<u8>]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let out = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&out);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_20_bytes() {
        let id = node_id_from_pk(b"some public key bytes");
        assert_eq!(id.len(), 20);
    }

    #[test]
    fn sha256_concat_matches_single_call() {
        let a = b"hello ".to_vec();
        let b = b"world".to_vec();
        let concatenated = sha256_concat(&[a.clone(), b.clone()]);
        let mut joined = a;
        joined.extend(b);
        assert_eq!(concatenated, sha256(&joined));
    }
}
