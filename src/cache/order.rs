//! Eviction Order Module
//!
//! Tracks the order in which resident keys become eviction candidates.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// == Eviction Policy ==
/// Which resident entry is evicted when a new key would exceed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Evict the earliest-inserted surviving key. Reads and overwrites do
    /// not change a key's position.
    #[default]
    InsertionOrder,
    /// Evict the least recently read or written key.
    Lru,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insertion" | "insertion_order" | "fifo" => Ok(Self::InsertionOrder),
            "lru" => Ok(Self::Lru),
            other => Err(format!("unknown eviction policy: {other}")),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsertionOrder => f.write_str("insertion_order"),
            Self::Lru => f.write_str("lru"),
        }
    }
}

// == Key Order ==
/// Resident keys ordered from next eviction candidate to last.
///
/// - Front = oldest (evicted first)
/// - Back = newest
#[derive(Debug, Default)]
pub struct KeyOrder {
    policy: EvictionPolicy,
    order: VecDeque<String>,
}

impl KeyOrder {
    // == Constructor ==
    /// Creates an empty tracker for `policy`.
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            order: VecDeque::new(),
        }
    }

    /// Returns the policy this tracker applies.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    // == Admit ==
    /// Appends a key that is not yet tracked.
    pub fn admit(&mut self, key: &str) {
        self.order.push_back(key.to_string());
    }

    // == Touch ==
    /// Records an access to a tracked key.
    ///
    /// Under `Lru` the key moves to the back; under `InsertionOrder` this is
    /// a no-op.
    pub fn touch(&mut self, key: &str) {
        if self.policy == EvictionPolicy::Lru {
            if let Some(pos) = self.order.iter().position(|k| k == key) {
                if let Some(k) = self.order.remove(pos) {
                    self.order.push_back(k);
                }
            }
        }
    }

    // == Remove ==
    /// Stops tracking `key`. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the next eviction candidate.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    /// Forgets every tracked key.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    /// Keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn order_of(tracker: &KeyOrder) -> Vec<&str> {
        tracker.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_order_new() {
        let tracker = KeyOrder::new(EvictionPolicy::InsertionOrder);
        assert!(tracker.is_empty());
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn test_admit_preserves_insertion_order() {
        let mut tracker = KeyOrder::new(EvictionPolicy::InsertionOrder);

        tracker.admit("key1");
        tracker.admit("key2");
        tracker.admit("key3");

        assert_eq!(order_of(&tracker), ["key1", "key2", "key3"]);
    }

    #[test]
    fn test_touch_is_noop_for_insertion_order() {
        let mut tracker = KeyOrder::new(EvictionPolicy::InsertionOrder);

        tracker.admit("a");
        tracker.admit("b");
        tracker.touch("a");

        assert_eq!(tracker.evict_oldest(), Some("a".to_string()));
    }

    #[test]
    fn test_touch_moves_to_back_for_lru() {
        let mut tracker = KeyOrder::new(EvictionPolicy::Lru);

        tracker.admit("a");
        tracker.admit("b");
        tracker.admit("c");
        tracker.touch("a");

        assert_eq!(order_of(&tracker), ["b", "c", "a"]);
        assert_eq!(tracker.evict_oldest(), Some("b".to_string()));
        assert_eq!(tracker.evict_oldest(), Some("c".to_string()));
        assert_eq!(tracker.evict_oldest(), Some("a".to_string()));
    }

    #[test]
    fn test_touch_unknown_key_for_lru() {
        let mut tracker = KeyOrder::new(EvictionPolicy::Lru);
        tracker.admit("a");
        tracker.touch("missing");
        assert_eq!(order_of(&tracker), ["a"]);
    }

    #[test]
    fn test_evict_empty() {
        let mut tracker = KeyOrder::new(EvictionPolicy::InsertionOrder);
        assert_eq!(tracker.evict_oldest(), None);
    }

    #[test]
    fn test_remove() {
        let mut tracker = KeyOrder::new(EvictionPolicy::InsertionOrder);

        tracker.admit("key1");
        tracker.admit("key2");
        tracker.admit("key3");
        tracker.remove("key2");
        tracker.remove("nonexistent");

        assert_eq!(order_of(&tracker), ["key1", "key3"]);
    }

    #[test]
    fn test_clear() {
        let mut tracker = KeyOrder::new(EvictionPolicy::Lru);
        tracker.admit("a");
        tracker.admit("b");
        tracker.clear();
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("lru".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Lru));
        assert_eq!(" LRU ".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Lru));
        assert_eq!("fifo".parse::<EvictionPolicy>(), Ok(EvictionPolicy::InsertionOrder));
        assert_eq!("insertion_order".parse::<EvictionPolicy>(), Ok(EvictionPolicy::InsertionOrder));
        assert!("random".parse::<EvictionPolicy>().is_err());
    }

    #[test]
    fn test_policy_serde_names_match_display() {
        for policy in [EvictionPolicy::InsertionOrder, EvictionPolicy::Lru] {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{policy}\""));
            let back: EvictionPolicy = serde_json::from_str(&json).unwrap();
            assert_eq!(back, policy);
        }
    }
}
