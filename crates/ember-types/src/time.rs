//! Monotonic-enough wall clock helper shared across the substrate.
//!
//! Mirrors the teacher's `ioi-telemetry::time` convention of centralizing
//! timestamp derivation in one place rather than scattering `SystemTime`
//! calls through business logic.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
