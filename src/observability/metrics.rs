//! Service counters
//!
//! Counters only, monotonic, reset on process start. Relaxed atomics: a
//! slightly stale read from `/observability/metrics` is fine.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Registry of operational counters, shared by the monitor and query engine.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    health_checks: AtomicU64,
    health_checks_skipped: AtomicU64,
    watermark_read_failures: AtomicU64,
    stalls_detected: AtomicU64,
    failovers: AtomicU64,
    failovers_failed: AtomicU64,
    range_queries: AtomicU64,
    point_queries: AtomicU64,
    query_errors: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_health_checks(&self) {
        self.health_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_health_checks_skipped(&self) {
        self.health_checks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_watermark_read_failures(&self) {
        self.watermark_read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stalls(&self) {
        self.stalls_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failovers(&self) {
        self.failovers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failovers_failed(&self) {
        self.failovers_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_range_queries(&self) {
        self.range_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_point_queries(&self) {
        self.point_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_query_errors(&self) {
        self.query_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            health_checks: self.health_checks.load(Ordering::Relaxed),
            health_checks_skipped: self.health_checks_skipped.load(Ordering::Relaxed),
            watermark_read_failures: self.watermark_read_failures.load(Ordering::Relaxed),
            stalls_detected: self.stalls_detected.load(Ordering::Relaxed),
            failovers: self.failovers.load(Ordering::Relaxed),
            failovers_failed: self.failovers_failed.load(Ordering::Relaxed),
            range_queries: self.range_queries.load(Ordering::Relaxed),
            point_queries: self.point_queries.load(Ordering::Relaxed),
            query_errors: self.query_errors.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub health_checks: u64,
    pub health_checks_skipped: u64,
    pub watermark_read_failures: u64,
    pub stalls_detected: u64,
    pub failovers: u64,
    pub failovers_failed: u64,
    pub range_queries: u64,
    pub point_queries: u64,
    pub query_errors: u64,
}
