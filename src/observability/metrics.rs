//! Execution counters
//!
//! Counters only, monotonic, relaxed atomics. One registry is shared by
//! every partition engine on a host.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Engine-wide counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    fragments_executed: AtomicU64,
    fragments_failed: AtomicU64,
    operators_executed: AtomicU64,
    /// Replicated writes run by a designated partition
    replicated_writes: AtomicU64,
    /// Times a follower waited on the barrier
    barrier_waits: AtomicU64,
    /// Barrier rounds that ended in a failure, counted once per observer
    barrier_failures: AtomicU64,
    window_rows_emitted: AtomicU64,
    tuples_modified: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_fragments_executed(&self) {
        self.fragments_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fragments_failed(&self) {
        self.fragments_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_operators_executed(&self) {
        self.operators_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replicated_writes(&self) {
        self.replicated_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_barrier_waits(&self) {
        self.barrier_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_barrier_failures(&self) {
        self.barrier_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_window_rows_emitted(&self, rows: u64) {
        self.window_rows_emitted.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn add_tuples_modified(&self, tuples: u64) {
        self.tuples_modified.fetch_add(tuples, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fragments_executed: self.fragments_executed.load(Ordering::Relaxed),
            fragments_failed: self.fragments_failed.load(Ordering::Relaxed),
            operators_executed: self.operators_executed.load(Ordering::Relaxed),
            replicated_writes: self.replicated_writes.load(Ordering::Relaxed),
            barrier_waits: self.barrier_waits.load(Ordering::Relaxed),
            barrier_failures: self.barrier_failures.load(Ordering::Relaxed),
            window_rows_emitted: self.window_rows_emitted.load(Ordering::Relaxed),
            tuples_modified: self.tuples_modified.load(Ordering::Relaxed),
        }
    }

    /// Snapshot rendered as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub fragments_executed: u64,
    pub fragments_failed: u64,
    pub operators_executed: u64,
    pub replicated_writes: u64,
    pub barrier_waits: u64,
    pub barrier_failures: u64,
    pub window_rows_emitted: u64,
    pub tuples_modified: u64,
}
