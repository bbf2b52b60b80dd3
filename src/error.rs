//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache construction and TTL validation.
///
/// Lookups never fail: a miss is `None`. Producer failures inside
/// [`TtlCache::wrap`](crate::cache::TtlCache::wrap) are returned as the
/// producer's own error type and never converted into this enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// TTL is zero or larger than [`Ttl::MAX`](crate::cache::Ttl::MAX)
    #[error("Invalid TTL: {0:?}")]
    InvalidTtl(Duration),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
