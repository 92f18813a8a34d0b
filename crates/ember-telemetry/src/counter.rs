//! A reusable atomic counter, the building block each crate's local
//! `Metrics` struct is assembled from — grounded on the teacher's
//! `metrics/mod.rs` modules (per-subsystem counter/gauge statics), scaled
//! down from Prometheus collectors to plain `AtomicU64`s since no external
//! metrics backend is wired up here.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn incr_by(&self, amount: u64) {
        self.0.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates() {
        let c = Counter::new();
        c.incr();
        c.incr_by(4);
        assert_eq!(c.get(), 5);
    }
}
