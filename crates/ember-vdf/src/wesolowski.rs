//! Sequential-squaring compute and fast verify for the Wesolowski VDF:
//! `spec.md` §4.1 `compute`/`verify`, §5 "VDF compute accepts a deadline...
//! and an explicit cancel signal".

use crate::error::VdfError;
use crate::group::{hash_to_group, modulus};
use crate::primes::hash_prime;
use ember_types::VdfProof;
use num_bigint::BigUint;
use num_traits::One;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Default compute deadline: `spec.md` §5 "default 35 s".
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(35);

pub struct ComputeHandle {
    pub progress: watch::Receiver<f64>,
    pub cancel: CancellationToken,
}

/// Runs the VDF off the caller's main loop (`spec.md` §4.1 "Scheduling"),
/// squaring sequentially and reporting progress through `progress_tx`.
/// Returns `None` if cancelled; times out per `deadline`.
pub async fn compute(
    input: Vec<u8>,
    iterations: u64,
    deadline: Duration,
) -> Result<(VdfProof, ComputeHandle), VdfError> {
    if iterations == 0 {
        return Err(VdfError::ZeroIterations);
    }
    let (progress_tx, progress_rx) = watch::channel(0.0f64);
    let cancel = CancellationToken::new();
    let handle = ComputeHandle {
        progress: progress_rx,
        cancel: cancel.clone(),
    };

    let worker_cancel = cancel.clone();
    let fut = tokio::task::spawn_blocking(move || compute_blocking(&input, iterations, progress_tx, worker_cancel));

    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(Some(proof))) => Ok((proof, handle)),
        Ok(Ok(None)) => Err(VdfError::Cancelled),
        Ok(Err(_join_err)) => Err(VdfError::Malformed("worker task panicked".into())),
        Err(_elapsed) => {
            cancel.cancel();
            Err(VdfError::Timeout)
        }
    }
}

fn compute_blocking(
    input: &[u8],
    iterations: u64,
    progress_tx: watch::Sender<f64>,
    cancel: CancellationToken,
) -> Option<VdfProof> {
    let n = modulus();
    let g = hash_to_group(input);

    let mut y = g.clone();
    let report_every = (iterations / 100).max(1);
    for i in 0..iterations {
        if cancel.is_cancelled() {
            return None;
        }
        y = y.modpow(&BigUint::from(2u32), n);
        if i % report_every == 0 {
            let _ = progress_tx.send(i as f64 / iterations as f64);
        }
    }
    let _ = progress_tx.send(1.0);

    let l = hash_prime(&g, &y, iterations);
    let two_pow_t = BigUint::one() << iterations as usize;
    let q = &two_pow_t / &l;
    let r = &two_pow_t % &l;
    let pi = g.modpow(&q, n);

    Some(VdfProof {
        y: y.to_bytes_be(),
        pi: pi.to_bytes_be(),
        l: l.to_bytes_be(),
        r: r.to_bytes_be(),
        iterations,
    })
}

/// Synchronous, fast verification: `spec.md` §4.1 `verify(input, proof)`.
pub fn verify(input: &[u8], proof: &VdfProof) -> bool {
    if proof.iterations == 0 {
        return false;
    }
    let n = modulus();
    let g = hash_to_group(input);
    let y = BigUint::from_bytes_be(&proof.y);
    let pi = BigUint::from_bytes_be(&proof.pi);
    let claimed_l = BigUint::from_bytes_be(&proof.l);
    let claimed_r = BigUint::from_bytes_be(&proof.r);

    let recomputed_l = hash_prime(&g, &y, proof.iterations);
    if recomputed_l != claimed_l {
        return false;
    }
    let recomputed_r = BigUint::from(2u32).modpow(&BigUint::from(proof.iterations), &claimed_l);
    if recomputed_r != claimed_r {
        return false;
    }

    let lhs = pi.modpow(&claimed_l, n) * g.modpow(&claimed_r, n) % n;
    lhs == y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn small_proof_round_trips() {
        let input = b"identity-binding-string".to_vec();
        let (proof, _handle) = compute(input.clone(), 200, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(verify(&input, &proof));
    }

    #[tokio::test]
    async fn tampered_proof_fails() {
        let input = b"identity-binding-string".to_vec();
        let (mut proof, _handle) = compute(input.clone(), 200, Duration::from_secs(5))
            .await
            .unwrap();
        proof.y[0] ^= 0xFF;
        assert!(!verify(&input, &proof));
    }

    #[tokio::test]
    async fn zero_iterations_rejected() {
        let err = compute(b"x".to_vec(), 0, Duration::from_secs(1)).await;
        assert!(matches!(err, Err(VdfError::ZeroIterations)));
    }

    #[tokio::test]
    async fn different_input_fails_verification() {
        let input = b"input-one".to_vec();
        let (proof, _handle) = compute(input, 200, Duration::from_secs(5)).await.unwrap();
        assert!(!verify(b"input-two", &proof));
    }
}
