//! Thread-safe TTL cache handle
//!
//! Wraps a [`CacheStore`] in a mutex and adds [`TtlCache::wrap`], which
//! memoizes an async producer per key with at most one producer in flight
//! per key.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore, Clock, SystemClock, Ttl};
use crate::config::CacheConfig;
use crate::error::Result;

/// Result of a finished load, published to every caller waiting on it.
///
/// The error is type-erased because the in-flight table is shared by
/// `wrap` calls with different producer error types.
#[derive(Clone)]
enum Outcome<V> {
    Ready(V),
    Failed(Arc<dyn Any + Send + Sync>),
}

type OutcomeRx<V> = watch::Receiver<Option<Outcome<V>>>;
type OutcomeTx<V> = watch::Sender<Option<Outcome<V>>>;

struct InFlight<V> {
    id: u64,
    rx: OutcomeRx<V>,
}

struct State<V, C> {
    store: CacheStore<V, C>,
    in_flight: HashMap<String, InFlight<V>>,
    next_load_id: u64,
}

impl<V, C> State<V, C> {
    /// Drops the in-flight slot for `key` if it still belongs to load `id`.
    fn release(&mut self, key: &str, id: u64) {
        if self.in_flight.get(key).is_some_and(|flight| flight.id == id) {
            self.in_flight.remove(key);
        }
    }
}

enum Role<V> {
    Hit(V),
    Leader(u64, OutcomeTx<V>),
    Follower(OutcomeRx<V>),
}

struct Shared<V, C> {
    state: Mutex<State<V, C>>,
    config: CacheConfig,
}

// == TTL Cache ==
/// Thread-safe, cloneable cache handle with TTL expiry, bounded size and
/// stampede-free memoization.
///
/// Clones share the same entries. Build one per application at startup and
/// pass it to whatever needs it.
///
/// # Example
/// ```
/// use ttl_memo::{CacheConfig, TtlCache};
///
/// let cache: TtlCache<String> = TtlCache::new(&CacheConfig::app_default()).unwrap();
/// cache.set("greeting", "hello".to_string(), None);
/// assert_eq!(cache.get("greeting").as_deref(), Some("hello"));
/// assert_eq!(cache.get("missing"), None);
/// ```
pub struct TtlCache<V, C = SystemClock> {
    inner: Arc<Shared<V, C>>,
}

impl<V, C> Clone for TtlCache<V, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, C> fmt::Debug for TtlCache<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<V, C> TtlCache<V, C> {
    // Store mutations finish before any `V::clone` runs under the lock, so a
    // poisoned lock still guards a consistent store.
    fn lock(&self) -> MutexGuard<'_, State<V, C>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> TtlCache<V, SystemClock> {
    /// Creates a cache on the system clock. Fails on an invalid configuration.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<V: Clone, C: Clock> TtlCache<V, C> {
    // == Constructor ==
    /// Creates a cache reading time from `clock`.
    pub fn with_clock(config: &CacheConfig, clock: C) -> Result<Self> {
        let store = CacheStore::with_clock(config, clock)?;
        Ok(Self {
            inner: Arc::new(Shared {
                state: Mutex::new(State {
                    store,
                    in_flight: HashMap::new(),
                    next_load_id: 0,
                }),
                config: config.clone(),
            }),
        })
    }

    // == Config ==
    /// Returns the configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // == Get ==
    /// Returns a clone of the live value for `key`, or `None` on a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().store.get(key).cloned()
    }

    // == Set ==
    /// Stores `value` under `key`; `None` uses the configured default TTL.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Ttl>) {
        self.lock().store.set(key, value, ttl);
    }

    // == Delete ==
    /// Removes `key`, returning whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().store.delete(key)
    }

    // == Clear ==
    /// Removes every entry. In-flight loads keep running and store their result.
    pub fn clear(&self) {
        self.lock().store.clear();
    }

    // == Cleanup ==
    /// Removes every expired entry and returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.lock().store.cleanup()
    }

    // == Size ==
    /// Resident entry count, including expired entries not yet purged.
    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    /// Returns true if no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.lock().store.is_empty()
    }

    // == Keys ==
    /// Snapshot of resident keys, next eviction candidate first.
    pub fn keys(&self) -> Vec<String> {
        self.lock().store.keys()
    }

    // == TTL Remaining ==
    /// Time left before `key` expires, or `None` if it is not resident.
    /// Does not count as a read.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.lock().store.ttl_remaining(key)
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().store.stats()
    }

    /// Number of keys with a producer currently running.
    pub fn loads_in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    // == Wrap ==
    /// Returns the cached value for `key`, or runs `producer` and caches its
    /// successful result for `ttl` (the default TTL when `None`).
    ///
    /// Concurrent calls for the same key share a single producer run: the
    /// first caller runs it and the rest wait for its outcome, receiving a
    /// clone of the value or of the error. Errors are never cached, so the
    /// next call after a failure runs a producer again. If the running
    /// caller is cancelled, one of the waiting callers takes over with its
    /// own producer.
    ///
    /// No lock is held while the producer runs.
    pub async fn wrap<F, Fut, E>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Ttl>,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Clone + Send + Sync + 'static,
    {
        let (id, tx) = loop {
            match self.join_or_lead(key) {
                Role::Hit(value) => return Ok(value),
                Role::Leader(id, tx) => break (id, tx),
                Role::Follower(rx) => {
                    if let Some(result) = Self::await_outcome::<E>(key, rx).await {
                        return result;
                    }
                }
            }
        };

        let load = Load {
            cache: self,
            key,
            id,
            tx: Some(tx),
        };

        debug!("Loading key '{}'", key);
        match producer().await {
            Ok(value) => {
                load.succeed(value.clone(), ttl);
                Ok(value)
            }
            Err(err) => {
                load.fail(err.clone());
                Err(err)
            }
        }
    }

    fn join_or_lead(&self, key: &str) -> Role<V> {
        let mut state = self.lock();
        if let Some(value) = state.store.get(key) {
            return Role::Hit(value.clone());
        }

        if let Some(flight) = state.in_flight.get(key) {
            let rx = flight.rx.clone();
            state.store.stats_mut().record_coalesced();
            return Role::Follower(rx);
        }

        let id = state.next_load_id;
        state.next_load_id += 1;
        let (tx, rx) = watch::channel(None);
        state.in_flight.insert(key.to_string(), InFlight { id, rx });
        state.store.stats_mut().record_load();
        Role::Leader(id, tx)
    }

    /// Waits for another caller's load. `None` means the load was abandoned
    /// or failed with an error of a different type, and the caller should
    /// try again.
    async fn await_outcome<E>(
        key: &str,
        mut rx: OutcomeRx<V>,
    ) -> Option<std::result::Result<V, E>>
    where
        E: Clone + 'static,
    {
        debug!("Waiting on in-flight load for key '{}'", key);
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(published) => published.clone(),
            Err(_) => {
                debug!("Load for key '{}' was abandoned, retrying", key);
                return None;
            }
        };

        match outcome? {
            Outcome::Ready(value) => Some(Ok(value)),
            Outcome::Failed(err) => err.downcast_ref::<E>().cloned().map(Err),
        }
    }
}

/// The running load for one key. Releases the in-flight slot when finished
/// or dropped; dropping without finishing wakes waiters so they can retry.
struct Load<'a, V, C> {
    cache: &'a TtlCache<V, C>,
    key: &'a str,
    id: u64,
    tx: Option<OutcomeTx<V>>,
}

impl<V: Clone, C: Clock> Load<'_, V, C> {
    fn succeed(mut self, value: V, ttl: Option<Ttl>) {
        if let Some(tx) = self.tx.take() {
            {
                let mut state = self.cache.lock();
                state.store.set(self.key, value.clone(), ttl);
                state.release(self.key, self.id);
            }
            tx.send_replace(Some(Outcome::Ready(value)));
        }
    }

    fn fail<E: Send + Sync + 'static>(mut self, err: E) {
        if let Some(tx) = self.tx.take() {
            {
                let mut state = self.cache.lock();
                state.store.stats_mut().record_load_failure();
                state.release(self.key, self.id);
            }
            debug!("Load for key '{}' failed, nothing cached", self.key);
            tx.send_replace(Some(Outcome::Failed(Arc::new(err))));
        }
    }
}

impl<V, C> Drop for Load<'_, V, C> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            warn!("Load for key '{}' dropped before completing", self.key);
            self.cache.lock().release(self.key, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_pending, task};

    fn cache(max_size: usize) -> (TtlCache<String, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let config = CacheConfig::default().with_max_size(max_size);
        (TtlCache::with_clock(&config, clock.clone()).unwrap(), clock)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = CacheConfig::default().with_default_ttl(Duration::ZERO);
        assert!(TtlCache::<String>::new(&config).is_err());
    }

    #[test]
    fn test_clones_share_entries() {
        let (cache, _) = cache(10);
        let other = cache.clone();

        cache.set("k", "v".to_string(), None);

        assert_eq!(other.get("k").as_deref(), Some("v"));
        assert!(other.delete("k"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_clear_and_len() {
        let (cache, _) = cache(10);

        cache.set("a", "1".to_string(), None);
        cache.set("b", "2".to_string(), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), ["a", "b"]);

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));

        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cleanup_through_handle() {
        let (cache, clock) = cache(10);

        cache.set("short", "1".to_string(), Some(Ttl::from_secs(10).unwrap()));
        cache.set("long", "2".to_string(), Some(Ttl::from_secs(100).unwrap()));
        clock.advance(Duration::from_secs(50));

        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.keys(), ["long"]);
    }

    #[test]
    fn test_wrap_caches_success() {
        let (cache, _) = cache(10);
        let calls = &AtomicUsize::new(0);

        for _ in 0..3 {
            let value = tokio_test::block_on(cache.wrap(
                "k",
                || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("computed".to_string())
                },
                None,
            ));
            assert_eq!(value.as_deref(), Ok("computed"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.loads_in_flight(), 0);
        let stats = cache.stats();
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn test_wrap_does_not_cache_failure() {
        let (cache, _) = cache(10);
        let calls = &AtomicUsize::new(0);

        let producer = || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(format!("attempt {n} failed"))
            } else {
                Ok("third time".to_string())
            }
        };

        assert_eq!(
            tokio_test::block_on(cache.wrap("k", producer, None)),
            Err("attempt 1 failed".to_string())
        );
        assert_eq!(
            tokio_test::block_on(cache.wrap("k", producer, None)),
            Err("attempt 2 failed".to_string())
        );
        assert!(cache.get("k").is_none());
        assert_eq!(
            tokio_test::block_on(cache.wrap("k", producer, None)).as_deref(),
            Ok("third time")
        );
        assert_eq!(
            tokio_test::block_on(cache.wrap("k", producer, None)).as_deref(),
            Ok("third time")
        );

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.stats().load_failures, 2);
        assert_eq!(cache.loads_in_flight(), 0);
    }

    #[test]
    fn test_wrap_reloads_after_expiry() {
        let (cache, clock) = cache(10);
        let calls = &AtomicUsize::new(0);
        let ttl = Some(Ttl::from_secs(5).unwrap());

        let load = || {
            tokio_test::block_on(cache.wrap(
                "k",
                || async move { Ok::<_, String>(calls.fetch_add(1, Ordering::SeqCst).to_string()) },
                ttl,
            ))
        };

        assert_eq!(load().as_deref(), Ok("0"));
        clock.advance(Duration::from_secs(4));
        assert_eq!(load().as_deref(), Ok("0"));
        clock.advance(Duration::from_secs(1));
        assert_eq!(load().as_deref(), Ok("1"));
    }

    #[test]
    fn test_dropped_load_releases_slot() {
        let (cache, _) = cache(10);

        let mut load = task::spawn(cache.wrap(
            "k",
            std::future::pending::<std::result::Result<String, String>>,
            None,
        ));
        assert_pending!(load.poll());
        assert_eq!(cache.loads_in_flight(), 1);

        drop(load);

        assert_eq!(cache.loads_in_flight(), 0);
        assert!(cache.get("k").is_none());
    }
}
