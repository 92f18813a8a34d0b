//! `spec.md` §6 "Recognized configuration options" — the subset owned by
//! the post engine.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PostEngineConfig {
    pub max_post_size: usize,
    pub trust_threshold: f64,
    pub attestation_timeout: Duration,
    pub verifier_pool_size: usize,
    pub rating_replay_window: Duration,
}

impl Default for PostEngineConfig {
    fn default() -> Self {
        Self {
            max_post_size: 4096,
            trust_threshold: 3.0,
            attestation_timeout: Duration::from_secs(5),
            verifier_pool_size: 4,
            rating_replay_window: Duration::from_secs(5 * 60),
        }
    }
}
