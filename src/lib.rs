//! TTL Memo - an in-memory cache for memoizing expensive async work
//!
//! Entries expire after a per-entry TTL, the cache holds at most a configured
//! number of entries, and [`TtlCache::wrap`] runs at most one producer per key
//! at a time.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStats, Clock, EvictionPolicy, ManualClock, SystemClock, Ttl, TtlCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
