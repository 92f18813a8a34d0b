//! `redb`-backed `KVStore`, grounded on the kernel's `RedbEpochStore`: a
//! single composite-key table, synchronous transactions offloaded to
//! `spawn_blocking` so the async surface never stalls the runtime.

use crate::error::StorageError;
use crate::keyspace::{composite_key, prefix_bounds};
use crate::store::KVStore;
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("kv");

pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(|e| StorageError::Backend(e.to_string()))?;
        // Ensure the table exists before any reader tries to open it.
        let write_txn = db.begin_write().map_err(|e| StorageError::Backend(e.to_string()))?;
        {
            let _ = write_txn
                .open_table(TABLE)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl KVStore for RedbStore {
    async fn put(&self, keyspace: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let db = self.db.clone();
        let composite = composite_key(keyspace, key);
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write().map_err(|e| StorageError::Backend(e.to_string()))?;
            {
                let mut table = write_txn
                    .open_table(TABLE)
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                table
                    .insert(composite.as_slice(), value.as_slice())
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
            }
            write_txn.commit().map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?
    }

    async fn get(&self, keyspace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let db = self.db.clone();
        let composite = composite_key(keyspace, key);
        tokio::task::spawn_blocking(move || {
            let read_txn = db.begin_read().map_err(|e| StorageError::Backend(e.to_string()))?;
            let table = read_txn
                .open_table(TABLE)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let found = table
                .get(composite.as_slice())
                .map_err(|e| StorageError::Backend(e.to_string()))?
                .map(|v| v.value().to_vec());
            Ok(found)
        })
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?
    }

    async fn delete(&self, keyspace: &str, key: &[u8]) -> Result<(), StorageError> {
        let db = self.db.clone();
        let composite = composite_key(keyspace, key);
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write().map_err(|e| StorageError::Backend(e.to_string()))?;
            {
                let mut table = write_txn
                    .open_table(TABLE)
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                table
                    .remove(composite.as_slice())
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
            }
            write_txn.commit().map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?
    }

    async fn iterate_prefix(
        &self,
        keyspace: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let db = self.db.clone();
        let (lower, upper) = prefix_bounds(keyspace, prefix);
        let keyspace_prefix_len = keyspace.len() + 1;
        tokio::task::spawn_blocking(move || {
            let read_txn = db.begin_read().map_err(|e| StorageError::Backend(e.to_string()))?;
            let table = read_txn
                .open_table(TABLE)
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let mut out = Vec::new();
            for entry in table
                .range(lower.as_slice()..upper.as_slice())
                .map_err(|e| StorageError::Backend(e.to_string()))?
            {
                let (k, v) = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
                out.push((k.value()[keyspace_prefix_len..].to_vec(), v.value().to_vec()));
            }
            Ok(out)
        })
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();
        store.put("posts/", b"id1", b"hello").await.unwrap();
        assert_eq!(store.get("posts/", b"id1").await.unwrap(), Some(b"hello".to_vec()));
        store.delete("posts/", b"id1").await.unwrap();
        assert_eq!(store.get("posts/", b"id1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn iterate_prefix_is_scoped_to_keyspace() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();
        store.put("posts/", b"a", b"1").await.unwrap();
        store.put("posts/", b"b", b"2").await.unwrap();
        store.put("peer_scores/", b"a", b"3").await.unwrap();

        let all = store.iterate_prefix("posts/", b"").await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|(k, v)| k == b"a" && v == b"1"));
        assert!(all.iter().any(|(k, v)| k == b"b" && v == b"2"));
    }
}
