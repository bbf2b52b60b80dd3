//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! memoized loads.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned a live value
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Entries removed to stay within `max_size`
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Producer invocations started by `wrap`
    pub loads: u64,
    /// Producer invocations that returned an error
    pub load_failures: u64,
    /// `wrap` calls that waited on a load started by another caller
    pub coalesced: u64,
    /// Current number of resident entries
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Recording ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Adds `count` purged entries to the expiration counter.
    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    /// Increments the counter of producer runs started.
    pub fn record_load(&mut self) {
        self.loads += 1;
    }

    /// Increments the counter of producer runs that failed.
    pub fn record_load_failure(&mut self) {
        self.load_failures += 1;
    }

    /// Increments the counter of callers that joined a running load.
    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    /// Sets the resident entry count reported in snapshots.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
