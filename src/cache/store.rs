//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with an eviction order tracker
//! and TTL expiration. All mutation goes through `&mut self`; see
//! [`TtlCache`](crate::cache::TtlCache) for the thread-safe handle.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, EvictionPolicy, KeyOrder, SystemClock, Ttl};
use crate::config::CacheConfig;
use crate::error::Result;

// == Cache Store ==
/// Single-owner cache storage with bounded size and per-entry TTL.
#[derive(Debug)]
pub struct CacheStore<V, C = SystemClock> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Eviction order over the same key set as `entries`
    order: KeyOrder,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL for entries stored without an explicit one
    default_ttl: Ttl,
    clock: C,
}

impl<V> CacheStore<V, SystemClock> {
    // == Constructor ==
    /// Creates a new CacheStore from a validated configuration.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<V, C: Clock> CacheStore<V, C> {
    /// Creates a new CacheStore reading time from `clock`.
    pub fn with_clock(config: &CacheConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            entries: HashMap::with_capacity(config.max_size.min(1024)),
            order: KeyOrder::new(config.eviction),
            stats: CacheStats::new(),
            max_entries: config.max_size,
            default_ttl: config.ttl()?,
            clock,
        })
    }

    // == Set ==
    /// Stores a value under `key`, expiring `ttl` (or the default TTL) from now.
    ///
    /// Overwriting an existing key never evicts. Inserting a new key into a
    /// full store evicts exactly one entry first: the earliest-inserted one,
    /// or the least recently used one under [`EvictionPolicy::Lru`].
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Ttl>) {
        let key = key.into();
        let now = self.clock.now();
        let entry = CacheEntry::new(value, now, ttl.unwrap_or(self.default_ttl));

        if self.entries.contains_key(&key) {
            self.order.touch(&key);
        } else {
            if self.entries.len() >= self.max_entries {
                self.evict_one();
            }
            self.order.admit(&key);
        }

        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
    }

    fn evict_one(&mut self) {
        if let Some(evicted) = self.order.evict_oldest() {
            if let Some(entry) = self.entries.remove(&evicted) {
                debug!(
                    "Evicted key '{}' (age {:?}) to stay within {} entries",
                    evicted,
                    entry.age_at(self.clock.now()),
                    self.max_entries
                );
            }
            self.stats.record_eviction();
        }
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Returns `None` when the key is absent or its TTL has elapsed; an
    /// expired entry is removed on the way out. Reads never extend a TTL.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!("Key '{}' expired on read", key);
            return None;
        }

        self.stats.record_hit();
        self.order.touch(key);
        self.entries.get(key).map(|entry| &entry.value)
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.order.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.set_total_entries(0);
    }

    // == Cleanup Expired ==
    /// Removes every entry whose TTL has elapsed.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == TTL Remaining ==
    /// Remaining TTL of a resident entry without touching or purging it.
    ///
    /// `Some(Duration::ZERO)` means the entry is expired but not yet purged.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.entries.get(key).map(|entry| entry.ttl_remaining_at(now))
    }

    // == Keys ==
    /// Snapshot of resident keys, next eviction candidate first.
    ///
    /// Includes entries that are expired but not yet purged.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    // == Length ==
    /// Number of resident entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Ttl {
        self.default_ttl
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.order.policy()
    }
}
