//! A simple RAII scope timer, grounded on the teacher's `telemetry::time`
//! module, genericized over a closure instead of a fixed `MetricsSink` trait
//! since each crate here keeps its own local `Metrics` struct rather than
//! sharing one sink hierarchy.

use std::time::Instant;

pub struct ScopeTimer<F: FnMut(f64)> {
    start: Instant,
    on_drop: F,
}

impl<F: FnMut(f64)> ScopeTimer<F> {
    /// Starts the timer. `on_drop` is invoked once, with the elapsed
    /// seconds, when the timer goes out of scope.
    pub fn new(on_drop: F) -> Self {
        Self { start: Instant::now(), on_drop }
    }
}

impl<F: FnMut(f64)> Drop for ScopeTimer<F> {
    fn drop(&mut self) {
        (self.on_drop)(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn records_elapsed_time_on_drop() {
        let observed = RefCell::new(None);
        {
            let _timer = ScopeTimer::new(|secs| *observed.borrow_mut() = Some(secs));
        }
        assert!(observed.borrow().is_some());
    }
}
