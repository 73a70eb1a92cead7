//! Pool statistics.
//!
//! Cumulative counters maintained by the pool and exposed as a
//! point-in-time [`Stats`] snapshot, safe to read concurrently with pool
//! operation.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// ============================================================================
// Counters
// ============================================================================

/// Internal atomic counter set.
///
/// Updated lock-free from acquire/release/sweep paths; read by
/// [`Counters::snapshot`].
#[derive(Debug, Default)]
pub(crate) struct Counters {
    /// Acquisitions satisfied from the idle registry.
    pub(crate) hits: AtomicU64,
    /// Acquisitions that dialed a new connection.
    pub(crate) misses: AtomicU64,
    /// Acquisitions that failed waiting for capacity.
    pub(crate) timeouts: AtomicU64,
    /// Connections ever created.
    pub(crate) total_created: AtomicU64,
    /// Connections evicted as stale (by age or idle time).
    pub(crate) stale_evicted: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn incr_hits(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn incr_misses(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn incr_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn incr_total_created(&self) {
        self.total_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn incr_stale_evicted(&self) {
        self.stale_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a snapshot with the given current idle count.
    pub(crate) fn snapshot(&self, idle: usize) -> Stats {
        Stats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            total_created: self.total_created.load(Ordering::Relaxed),
            idle: idle as u64,
            stale_evicted: self.stale_evicted.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Point-in-time pool statistics.
///
/// Returned by [`Pool::stats`](crate::Pool::stats). Counters are
/// cumulative since pool creation except `idle`, which is the current
/// idle registry size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Acquisitions satisfied by reusing an idle connection.
    pub hits: u64,
    /// Acquisitions that dialed a new connection.
    pub misses: u64,
    /// Acquisitions that timed out waiting for capacity.
    pub timeouts: u64,
    /// Connections ever created.
    pub total_created: u64,
    /// Connections currently idle.
    pub idle: u64,
    /// Connections evicted as stale.
    pub stale_evicted: u64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = Counters::default();
        counters.incr_hits();
        counters.incr_hits();
        counters.incr_misses();
        counters.incr_timeouts();
        counters.incr_total_created();
        counters.incr_stale_evicted();

        let stats = counters.snapshot(3);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.total_created, 1);
        assert_eq!(stats.idle, 3);
        assert_eq!(stats.stale_evicted, 1);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = Stats {
            hits: 1,
            misses: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 2);
    }
}
