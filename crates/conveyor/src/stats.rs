//! Operator statistics
//!
//! Counters are updated lock-free by every worker of an operator and can be
//! read at any time through a cloned [`OperatorStats`] handle.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    items_received: AtomicU64,
    items_forwarded: AtomicU64,
    items_dropped: AtomicU64,
    type_mismatches: AtomicU64,
    item_errors: AtomicU64,
    windows_emitted: AtomicU64,
}

/// Shared handle to an operator's counters
#[derive(Debug, Clone, Default)]
pub struct OperatorStats {
    counters: Arc<Counters>,
}

/// Point-in-time copy of an operator's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStatsSnapshot {
    /// Items taken from the input channel
    pub items_received: u64,

    /// Items published on the output channel
    pub items_forwarded: u64,

    /// Items dropped by a filter, skip or nil outcome
    pub items_dropped: u64,

    /// Items dropped because their type did not match the operator input
    pub type_mismatches: u64,

    /// Per-item errors reported on the log bus
    pub item_errors: u64,

    /// Window buffers emitted (window operators only)
    pub windows_emitted: u64,
}

impl OperatorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_received(&self) {
        self.counters.items_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_forwarded(&self) {
        self.counters.items_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped(&self) {
        self.counters.items_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_type_mismatches(&self) {
        self.counters.type_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_item_errors(&self) {
        self.counters.item_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_windows_emitted(&self) {
        self.counters.windows_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> OperatorStatsSnapshot {
        let c = &self.counters;
        OperatorStatsSnapshot {
            items_received: c.items_received.load(Ordering::Relaxed),
            items_forwarded: c.items_forwarded.load(Ordering::Relaxed),
            items_dropped: c.items_dropped.load(Ordering::Relaxed),
            type_mismatches: c.type_mismatches.load(Ordering::Relaxed),
            item_errors: c.item_errors.load(Ordering::Relaxed),
            windows_emitted: c.windows_emitted.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_methods() {
        let stats = OperatorStats::new();

        stats.inc_received();
        stats.inc_received();
        stats.inc_forwarded();
        stats.inc_dropped();
        stats.inc_type_mismatches();
        stats.inc_item_errors();
        stats.inc_windows_emitted();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.items_received, 2);
        assert_eq!(snapshot.items_forwarded, 1);
        assert_eq!(snapshot.items_dropped, 1);
        assert_eq!(snapshot.type_mismatches, 1);
        assert_eq!(snapshot.item_errors, 1);
        assert_eq!(snapshot.windows_emitted, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = OperatorStats::new();
        let handle = stats.clone();
        stats.inc_forwarded();
        assert_eq!(handle.snapshot().items_forwarded, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = OperatorStatsSnapshot::default();
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["items_received"], 0);
    }
}
