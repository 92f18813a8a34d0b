//! Full verification pipeline and worker pool: `spec.md` §4.8 step 4 "submit
//! to the verification pipeline (full VDF + signature across parallel
//! verifier workers)", §9 "Verifier pool".
//!
//! The main loop never runs VDF verification itself (`spec.md` §5): it
//! dispatches jobs over a bounded channel to a fixed pool of worker tasks
//! and receives outcomes back on a single results channel.

use crate::config::PostEngineConfig;
use ember_crypto::Verifier;
use ember_types::post::Post;
use tokio::sync::mpsc;
use tracing::warn;

/// `verify(P.signature) && verify(P.author_vdf) && verify(P.post_vdf)`,
/// `spec.md` §8's per-post acceptance invariant.
pub fn verify_post_fully(post: &Post) -> bool {
    if Verifier::verify(&post.author_pk, &post.canonical_bytes(), &post.signature).is_err() {
        return false;
    }
    if !ember_vdf::verify(&post.vdf_input, &post.vdf_proof) {
        return false;
    }
    if !ember_vdf::verify(&post.author_vdf_input, &post.author_vdf_proof) {
        return false;
    }
    true
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub post_id: [u8; 16],
    pub accepted: bool,
}

/// A fixed-size pool of worker tasks, each an independent verifier: jobs are
/// sent over a bounded `mpsc` channel, results come back on a single shared
/// channel, matching `spec.md` §9's "batches pending posts into chunks equal
/// to pool size".
pub struct VerifierPool {
    job_tx: mpsc::Sender<Post>,
}

impl VerifierPool {
    pub fn spawn(config: &PostEngineConfig, results_tx: mpsc::Sender<VerificationResult>) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Post>(config.verifier_pool_size * 4);
        let job_rx = std::sync::Arc::new(tokio::sync::Mutex::new(job_rx));

        for worker_id in 0..config.verifier_pool_size {
            let job_rx = job_rx.clone();
            let results_tx = results_tx.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = job_rx.lock().await;
                        rx.recv().await
                    };
                    let Some(post) = job else {
                        break;
                    };
                    let accepted = verify_post_fully(&post);
                    if !accepted {
                        warn!(worker_id, post_id = ?post.id, "post failed full verification");
                    }
                    if results_tx
                        .send(VerificationResult { post_id: post.id, accepted })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }

        Self { job_tx }
    }

    pub async fn submit(&self, post: Post) -> bool {
        self.job_tx.send(post).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_crypto::SignKeyPair;
    use ember_types::VdfProof;

    fn signed_post(keypair: &SignKeyPair) -> Post {
        let mut post = Post {
            id: [1u8; 16],
            author: "alice".into(),
            author_pk: keypair.public_key_bytes(),
            timestamp: 0,
            parent_id: None,
            content: "hi".into(),
            image_hash: None,
            image_meta: None,
            vdf_input: vec![],
            vdf_proof: VdfProof { y: vec![], pi: vec![], l: vec![], r: vec![], iterations: 0 },
            author_vdf_input: vec![],
            author_vdf_proof: VdfProof { y: vec![], pi: vec![], l: vec![], r: vec![], iterations: 0 },
            signature: vec![],
            carriers: Default::default(),
            replies: Default::default(),
            depth: 0,
            trust_score: 0.0,
            attesters: Default::default(),
            explicitly_carrying: false,
        };
        post.signature = keypair.sign(&post.canonical_bytes());
        post
    }

    #[tokio::test]
    async fn zero_iteration_vdf_fails_full_verification() {
        let keypair = SignKeyPair::generate();
        let post = signed_post(&keypair);
        assert!(!verify_post_fully(&post));
    }

    #[tokio::test]
    async fn a_post_with_a_missing_author_vdf_is_rejected_even_with_a_valid_post_vdf() {
        use crate::compose::Composer;

        let keypair = SignKeyPair::generate();
        let composer = Composer::new(keypair, "alice".into(), [9u8; 20], None, std::sync::Arc::new(|_: &str| false), None);
        let config = PostEngineConfig::default();
        let mut post = composer.compose("hello".into(), None, None, None, 0, &config).await.unwrap();
        assert!(verify_post_fully(&post));

        post.author_vdf_proof.iterations = 0;
        assert!(!verify_post_fully(&post));
    }

    #[tokio::test]
    async fn pool_reports_results_for_submitted_jobs() {
        let keypair = SignKeyPair::generate();
        let post = signed_post(&keypair);
        let config = PostEngineConfig::default();
        let (results_tx, mut results_rx) = mpsc::channel(4);
        let pool = VerifierPool::spawn(&config, results_tx);

        assert!(pool.submit(post.clone()).await);
        let result = results_rx.recv().await.unwrap();
        assert_eq!(result.post_id, post.id);
        assert!(!result.accepted);
    }
}
