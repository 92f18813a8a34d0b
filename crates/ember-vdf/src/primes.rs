//! Miller-Rabin primality testing and the Fiat-Shamir prime challenge used
//! by the Wesolowski proof (`spec.md` §4.1's `l`).

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

const MILLER_RABIN_ROUNDS: u32 = 20;
const SMALL_PRIMES: &[u64] = &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47];

pub fn is_probable_prime(n: &BigUint) -> bool {
    if n < &BigUint::from(2u32) {
        return false;
    }
    for &p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if n == &p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }
    miller_rabin(n, MILLER_RABIN_ROUNDS)
}

fn miller_rabin(n: &BigUint, rounds: u32) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let n_minus_1 = n - &one;

    let mut d = n_minus_1.clone();
    let mut r: u32 = 0;
    while (&d % &two).is_zero() {
        d /= &two;
        r += 1;
    }

    let mut rng = OsRng;
    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_1);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_1 {
            continue;
        }
        for _ in 0..r.saturating_sub(1) {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// The next probable prime at or after `start`.
pub fn next_probable_prime(start: &BigUint) -> BigUint {
    let mut candidate = start.clone();
    if (&candidate % BigUint::from(2u32)).is_zero() {
        candidate += BigUint::one();
    }
    while !is_probable_prime(&candidate) {
        candidate += BigUint::from(2u32);
    }
    candidate
}

/// Fiat-Shamir challenge prime `l = Hprime(g, y, iterations)`: hash the
/// transcript into a 128-bit seed, then walk forward to the next prime.
pub fn hash_prime(g: &BigUint, y: &BigUint, iterations: u64) -> BigUint {
    let mut hasher = Sha256::new();
    hasher.update(g.to_bytes_be());
    hasher.update(y.to_bytes_be());
    hasher.update(iterations.to_be_bytes());
    let digest = hasher.finalize();
    let seed = BigUint::from_bytes_be(&digest[..16]);
    next_probable_prime(&seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_primes_and_composites() {
        assert!(is_probable_prime(&BigUint::from(97u32)));
        assert!(!is_probable_prime(&BigUint::from(100u32)));
        assert!(is_probable_prime(&BigUint::from(2u32)));
        assert!(!is_probable_prime(&BigUint::from(1u32)));
    }

    #[test]
    fn hash_prime_is_deterministic() {
        let g = BigUint::from(7u32);
        let y = BigUint::from(123456789u64);
        let a = hash_prime(&g, &y, 1000);
        let b = hash_prime(&g, &y, 1000);
        assert_eq!(a, b);
        assert!(is_probable_prime(&a));
    }
}
