//! In-memory `KVStore`, used by unit and integration tests that don't need
//! real persistence across restarts.

use crate::error::StorageError;
use crate::keyspace::composite_key;
use crate::store::KVStore;
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemStore {
    inner: DashMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KVStore for MemStore {
    async fn put(&self, keyspace: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.inner.insert(composite_key(keyspace, key), value.to_vec());
        Ok(())
    }

    async fn get(&self, keyspace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.inner.get(&composite_key(keyspace, key)).map(|v| v.clone()))
    }

    async fn delete(&self, keyspace: &str, key: &[u8]) -> Result<(), StorageError> {
        self.inner.remove(&composite_key(keyspace, key));
        Ok(())
    }

    async fn iterate_prefix(
        &self,
        keyspace: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let full_prefix = composite_key(keyspace, prefix);
        let mut out: Vec<(Vec<u8>, Vec<u8>)> = self
            .inner
            .iter()
            .filter(|entry| entry.key().starts_with(&full_prefix))
            .map(|entry| (entry.key()[keyspace.len() + 1..].to_vec(), entry.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = MemStore::new();
        store.put("posts/", b"id1", b"hello").await.unwrap();
        assert_eq!(store.get("posts/", b"id1").await.unwrap(), Some(b"hello".to_vec()));
        store.delete("posts/", b"id1").await.unwrap();
        assert_eq!(store.get("posts/", b"id1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn iterate_prefix_is_scoped_and_sorted() {
        let store = MemStore::new();
        store.put("posts/", b"b", b"2").await.unwrap();
        store.put("posts/", b"a", b"1").await.unwrap();
        store.put("peer_scores/", b"a", b"3").await.unwrap();

        let all = store.iterate_prefix("posts/", b"").await.unwrap();
        assert_eq!(all, vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]);
    }
}
