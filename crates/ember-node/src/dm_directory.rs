//! The `ember_post::dm::RecipientDirectory` seam, resolving a handle's
//! encryption key from the local identity cache first and falling back to
//! the DHT's `identity:handle:<handle>` record, mirroring
//! `ember_identity`'s own confirmed/DHT-resolved split.

use async_trait::async_trait;
use ember_dht::Dht;
use ember_identity::IdentityRegistry;
use ember_post::dm::RecipientDirectory;
use ember_types::identity::Identity;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct NodeRecipientDirectory {
    identity: Arc<Mutex<IdentityRegistry>>,
    dht: Arc<Mutex<Dht>>,
}

impl NodeRecipientDirectory {
    pub fn new(identity: Arc<Mutex<IdentityRegistry>>, dht: Arc<Mutex<Dht>>) -> Self {
        Self { identity, dht }
    }
}

#[async_trait]
impl RecipientDirectory for NodeRecipientDirectory {
    async fn encryption_key_for(&self, handle: &str) -> Option<Vec<u8>> {
        if let Some(identity) = self.identity.lock().await.resolve(handle) {
            return Some(identity.pk_enc.clone());
        }
        let key = ember_dht::identity_key(handle);
        let raw = self.dht.lock().await.find_value(&key).await.ok()?;
        let resolved: Identity = serde_json::from_slice(&raw).ok()?;
        self.identity.lock().await.adopt_confirmed(resolved.clone());
        Some(resolved.pk_enc)
    }
}
