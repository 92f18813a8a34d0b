//! Lightweight connection counters, mirroring the teacher's
//! `networking::metrics` module but backed directly by atomics instead of an
//! injected sink trait (this substrate has no external metrics backend to
//! target).

use ember_telemetry::Counter;
use std::sync::OnceLock;

#[derive(Default)]
pub struct Metrics {
    pub inbound_messages: Counter,
    pub outbound_messages: Counter,
    pub connections_accepted: Counter,
    pub connections_dialed: Counter,
    pub rpc_timeouts: Counter,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::default)
}
