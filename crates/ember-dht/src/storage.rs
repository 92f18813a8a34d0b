//! `spec.md` §4.4 replication bookkeeping: "maintains a
//! `replicationStatus: key -> {replicas, last_check}`. Under-replicated
//! keys take priority."

use ember_types::time::now_ms;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct ReplicationStatus {
    pub replicas: usize,
    pub last_check_ms: i64,
}

#[derive(Default)]
pub struct ReplicationTracker {
    status: HashMap<Vec<u8>, ReplicationStatus>,
}

impl ReplicationTracker {
    pub fn record(&mut self, key: Vec<u8>, replicas: usize) {
        self.status.insert(
            key,
            ReplicationStatus {
                replicas,
                last_check_ms: now_ms(),
            },
        );
    }

    pub fn status_for(&self, key: &[u8]) -> Option<ReplicationStatus> {
        self.status.get(key).copied()
    }

    /// Keys whose replication is older than `refresh_interval_ms`, most
    /// under-replicated first.
    pub fn due_for_refresh(&self, refresh_interval_ms: i64, target_replicas: usize) -> Vec<Vec<u8>> {
        let now = now_ms();
        let mut due: Vec<(Vec<u8>, usize)> = self
            .status
            .iter()
            .filter(|(_, s)| now - s.last_check_ms >= refresh_interval_ms)
            .map(|(k, s)| (k.clone(), s.replicas))
            .collect();
        due.sort_by_key(|(_, replicas)| *replicas);
        due.into_iter()
            .filter(|(_, replicas)| *replicas < target_replicas)
            .map(|(k, _)| k)
            .chain(
                self.status
                    .iter()
                    .filter(|(_, s)| now - s.last_check_ms >= refresh_interval_ms && s.replicas >= target_replicas)
                    .map(|(k, _)| k.clone()),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_replicated_keys_sort_first() {
        let mut tracker = ReplicationTracker::default();
        tracker.status.insert(b"well-replicated".to_vec(), ReplicationStatus { replicas: 20, last_check_ms: 0 });
        tracker.status.insert(b"under-replicated".to_vec(), ReplicationStatus { replicas: 2, last_check_ms: 0 });
        let due = tracker.due_for_refresh(1, 20);
        assert_eq!(due.first(), Some(&b"under-replicated".to_vec()));
    }
}
