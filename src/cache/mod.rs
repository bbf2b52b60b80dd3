//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, bounded size and
//! memoization of async producers.

mod clock;
mod entry;
mod order;
mod stats;
mod store;
mod ttl_cache;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, Ttl};
pub use order::{EvictionPolicy, KeyOrder};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use ttl_cache::TtlCache;
