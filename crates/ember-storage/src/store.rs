//! The `KVStore` persistence surface: `spec.md` §6, backing the DHT routing
//! table, post/chunk state, and pending-message queues.

use crate::error::StorageError;
use async_trait::async_trait;

#[async_trait]
pub trait KVStore: Send + Sync {
    async fn put(&self, keyspace: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    async fn get(&self, keyspace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    async fn delete(&self, keyspace: &str, key: &[u8]) -> Result<(), StorageError>;

    /// Every `(key, value)` pair in `keyspace` whose key starts with `prefix`,
    /// in ascending key order.
    async fn iterate_prefix(
        &self,
        keyspace: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;
}
