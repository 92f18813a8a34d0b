//! Post composition: `spec.md` §4.8 "Composition".

use crate::config::PostEngineConfig;
use crate::error::PostError;
use ember_blobstore::BlobStore;
use ember_crypto::SignKeyPair;
use ember_types::post::Post;
use ember_types::time::now_ms;
use ember_types::Calibration;
use ember_vdf::wesolowski::DEFAULT_DEADLINE;
use std::sync::Arc;
use tracing::debug;

/// The two external collaborators composition needs beyond the engine's own
/// state: a toxicity classifier and, optionally, a blob store for image
/// attachments (`spec.md` §6 "Two external collaborators get minimal trait
/// seams").
pub type ToxicityPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Target duration for the author-bound VDF: lighter than the content VDF's
/// adaptive cost since it proves only "this node computed something just
/// now", not a rate limit on content volume (`spec.md` §8's `verify_vdf(P.author_vdf)`
/// is checked independent of `trust_score`, so it stays cheap enough to pay
/// on every post).
const AUTHOR_VDF_TARGET_MS: u64 = 200;

pub struct Composer {
    keypair: SignKeyPair,
    handle: String,
    node_id: [u8; 20],
    blobstore: Option<Arc<BlobStore>>,
    toxicity: ToxicityPredicate,
    calibration: Option<Calibration>,
}

impl Composer {
    pub fn new(
        keypair: SignKeyPair,
        handle: String,
        node_id: [u8; 20],
        blobstore: Option<Arc<BlobStore>>,
        toxicity: ToxicityPredicate,
        calibration: Option<Calibration>,
    ) -> Self {
        Self {
            keypair,
            handle,
            node_id,
            blobstore,
            toxicity,
            calibration,
        }
    }

    /// `spec.md` §4.8 "Composition" steps 1-4. Dissemination (step 5) is the
    /// caller's concern once a signed, carrier-initialized `Post` exists.
    pub async fn compose(
        &self,
        content: String,
        parent_id: Option<[u8; 16]>,
        parent_depth: Option<u32>,
        image_bytes: Option<&[u8]>,
        recent_post_count_last_hour: usize,
        config: &PostEngineConfig,
    ) -> Result<Post, PostError> {
        if content.len() > config.max_post_size {
            return Err(PostError::SizeExceeded);
        }
        if (self.toxicity)(&content) {
            return Err(PostError::ToxicContent);
        }

        let (image_hash, image_meta) = match image_bytes {
            Some(bytes) => {
                let blobstore = self.blobstore.as_ref().ok_or(PostError::NotFound)?;
                let meta = blobstore.store(bytes).await.map_err(|_| PostError::NotFound)?;
                (Some(meta.hash), Some(meta))
            }
            None => (None, None),
        };

        let timestamp = now_ms();
        let is_reply = parent_id.is_some();
        let vdf_input = compose_vdf_input(&content, &self.node_id, timestamp);

        let target_ms = ember_vdf::adaptive_target_ms(recent_post_count_last_hour, &content, is_reply);
        let iterations = ember_vdf::estimate_iterations_for_ms(target_ms, self.calibration.as_ref());
        debug!(target_ms, iterations, "scheduling post vdf compute");
        let (vdf_proof, _handle) = ember_vdf::compute(vdf_input.clone(), iterations, DEFAULT_DEADLINE)
            .await
            .map_err(|_| PostError::InvalidVdf)?;

        let author_vdf_input = author_vdf_input(&self.node_id);
        let author_iterations = ember_vdf::estimate_iterations_for_ms(AUTHOR_VDF_TARGET_MS, self.calibration.as_ref());
        let (author_vdf_proof, _handle) = ember_vdf::compute(author_vdf_input.clone(), author_iterations, DEFAULT_DEADLINE)
            .await
            .map_err(|_| PostError::InvalidVdf)?;

        let mut post = Post {
            id: rand::random(),
            author: self.handle.clone(),
            author_pk: self.keypair.public_key_bytes(),
            timestamp,
            parent_id,
            content,
            image_hash,
            image_meta,
            vdf_input,
            vdf_proof,
            author_vdf_input,
            author_vdf_proof,
            signature: Vec::new(),
            carriers: [self.handle.clone()].into_iter().collect(),
            replies: Default::default(),
            depth: Post::depth_for(parent_depth),
            trust_score: 0.0,
            attesters: Default::default(),
            explicitly_carrying: true,
        };
        post.signature = self.keypair.sign(&post.canonical_bytes());
        Ok(post)
    }
}

/// `vdf_input = content || author.unique_id || now_ms`.
fn compose_vdf_input(content: &str, author_unique_id: &[u8; 20], now_ms: i64) -> Vec<u8> {
    let mut input = Vec::with_capacity(content.len() + 20 + 8);
    input.extend_from_slice(content.as_bytes());
    input.extend_from_slice(author_unique_id);
    input.extend_from_slice(&now_ms.to_be_bytes());
    input
}

/// The author-bound VDF's input, independent of `content` so it proves
/// authorship of this post rather than re-proving the content-rate-limit
/// already covered by `vdf_input`: `author.unique_id || random 16 bytes`,
/// the same shape `identity_flow::claim_vdf_input` uses for claims.
fn author_vdf_input(author_unique_id: &[u8; 20]) -> Vec<u8> {
    let mut input = author_unique_id.to_vec();
    let nonce: [u8; 16] = rand::random();
    input.extend_from_slice(&nonce);
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_blobstore::NullFetcher;
    use ember_storage::MemStore;

    fn harmless(_: &str) -> bool {
        false
    }

    #[tokio::test]
    async fn composes_a_signed_post_without_an_image() {
        let keypair = SignKeyPair::generate();
        let composer = Composer::new(keypair, "alice".into(), [1u8; 20], None, Arc::new(harmless), None);
        let config = PostEngineConfig::default();

        let post = composer
            .compose("hello world".into(), None, None, None, 0, &config)
            .await
            .unwrap();

        assert_eq!(post.author, "alice");
        assert!(post.carriers.contains("alice"));
        assert!(post.explicitly_carrying);
        assert_eq!(post.depth, 0);
        ember_crypto::Verifier::verify(&post.author_pk, &post.canonical_bytes(), &post.signature).unwrap();
        assert!(ember_vdf::verify(&post.vdf_input, &post.vdf_proof));
        assert!(ember_vdf::verify(&post.author_vdf_input, &post.author_vdf_proof));
        assert_ne!(post.vdf_input, post.author_vdf_input);
    }

    #[tokio::test]
    async fn oversize_content_is_rejected() {
        let keypair = SignKeyPair::generate();
        let composer = Composer::new(keypair, "alice".into(), [1u8; 20], None, Arc::new(harmless), None);
        let mut config = PostEngineConfig::default();
        config.max_post_size = 4;

        let err = composer
            .compose("way too long".into(), None, None, None, 0, &config)
            .await
            .unwrap_err();
        assert_eq!(err, PostError::SizeExceeded);
    }

    #[tokio::test]
    async fn toxic_content_is_rejected() {
        let keypair = SignKeyPair::generate();
        let composer = Composer::new(keypair, "alice".into(), [1u8; 20], None, Arc::new(|_: &str| true), None);
        let config = PostEngineConfig::default();

        let err = composer.compose("spam".into(), None, None, None, 0, &config).await.unwrap_err();
        assert_eq!(err, PostError::ToxicContent);
    }

    #[tokio::test]
    async fn image_attachment_goes_through_the_blobstore() {
        let keypair = SignKeyPair::generate();
        let store = Arc::new(MemStore::new());
        let blobstore = Arc::new(BlobStore::new(store, Arc::new(NullFetcher)));
        let composer = Composer::new(keypair, "alice".into(), [1u8; 20], Some(blobstore), Arc::new(harmless), None);
        let config = PostEngineConfig::default();

        let post = composer
            .compose("with image".into(), None, None, Some(b"some image bytes"), 0, &config)
            .await
            .unwrap();
        assert!(post.image_hash.is_some());
        assert!(post.image_meta.is_some());
    }
}
