//! Configuration Module
//!
//! Handles loading and validating cache configuration, optionally from
//! environment variables.

use std::env;
use std::time::Duration;

use crate::cache::{EvictionPolicy, Ttl};
use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied when a caller does not pass one
    pub default_ttl: Duration,
    /// Maximum number of resident entries
    pub max_size: usize,
    /// Which entry gives way when a new key would exceed `max_size`
    pub eviction: EvictionPolicy,
    /// Interval between background cleanup sweeps
    pub cleanup_interval: Duration,
}

impl CacheConfig {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_MAX_SIZE: usize = 100;
    pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

    /// Preset for the application-wide instance: 5 minute TTL, 50 entries.
    ///
    /// The instance is still constructed explicitly at startup and handed to
    /// whatever needs it.
    pub fn app_default() -> Self {
        Self {
            max_size: 50,
            ..Self::default()
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_MAX_SIZE` - Maximum resident entries (default: 100)
    /// - `CACHE_EVICTION` - `insertion_order` or `lru` (default: insertion_order)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Cleanup frequency in seconds (default: 60)
    ///
    /// Unparseable values fall back to the default; out-of-range values are
    /// caught by [`validate`](Self::validate) when the cache is built.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_ttl),
            max_size: env::var("CACHE_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_size),
            eviction: env::var("CACHE_EVICTION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.eviction),
            cleanup_interval: env::var("CACHE_CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    // == Builders ==
    /// Sets the TTL used when `set` or `wrap` gets none.
    pub fn with_default_ttl(mut self, default_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self
    }

    /// Sets the maximum number of resident entries.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets which key is evicted when the cache is full.
    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Sets the period of the background cleanup task.
    pub fn with_cleanup_interval(mut self, cleanup_interval: Duration) -> Self {
        self.cleanup_interval = cleanup_interval;
        self
    }

    // == Validate ==
    /// Rejects non-positive sizes and durations.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be at least 1".to_string(),
            ));
        }
        Ttl::new(self.default_ttl)?;
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The default TTL as a validated [`Ttl`].
    pub(crate) fn ttl(&self) -> Result<Ttl> {
        Ttl::new(self.default_ttl)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Self::DEFAULT_TTL,
            max_size: Self::DEFAULT_MAX_SIZE,
            eviction: EvictionPolicy::default(),
            cleanup_interval: Self::DEFAULT_CLEANUP_INTERVAL,
        }
    }
}
