//! Content-addressed result cache.
//!
//! Only function nodes (and interrupt nodes that opt in) may have
//! `cache_enabled`; gates and subgraph nodes reject it at construction
//! (`Node::with_cache_enabled`), so the routing-decision-in-cache path
//! described for gates elsewhere never actually triggers here.

use crate::types::Outputs;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Reserved key a cached blob would carry a gate's routing decision under,
/// were gate caching ever enabled. Never exposed to callers.
pub const ROUTING_DECISION_KEY: &str = "__routing_decision__";

/// A content-addressed key: `SHA-256(definition_hash || serialized_inputs)`.
pub type CacheKey = [u8; 32];

/// Derive a cache key from a node's definition hash and its (serializable)
/// inputs, sorted by parameter name for stability. Returns `None` if the
/// inputs cannot be serialized — callers should then execute normally
/// rather than fail the run.
pub fn compute_cache_key<V: serde::Serialize>(definition_hash: &str, inputs: &Outputs<V>) -> Option<CacheKey> {
    let mut sorted: Vec<(&String, &V)> = inputs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let serialized = bincode::serialize(&sorted).ok()?;

    let mut hasher = Sha256::new();
    hasher.update(definition_hash.as_bytes());
    hasher.update(&serialized);
    Some(hasher.finalize().into())
}

/// Pluggable cache backend.
pub trait CacheBackend<V>: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Outputs<V>>;
    fn set(&self, key: CacheKey, value: Outputs<V>);
}

struct LruEntry<V> {
    value: Outputs<V>,
}

/// In-memory cache with an optional LRU cap.
///
/// `max_size = 0` disables caching entirely (every `get` misses, every
/// `set` is a no-op); `max_size = 1` retains only the most recently stored
/// distinct key.
pub struct InMemoryCache<V> {
    max_size: usize,
    inner: Mutex<InMemoryCacheInner<V>>,
}

struct InMemoryCacheInner<V> {
    entries: HashMap<CacheKey, LruEntry<V>>,
    /// Most-recently-used order, back = most recent.
    order: Vec<CacheKey>,
}

impl<V: Clone> InMemoryCache<V> {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            inner: Mutex::new(InMemoryCacheInner {
                entries: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send + Sync> CacheBackend<V> for InMemoryCache<V> {
    fn get(&self, key: &CacheKey) -> Option<Outputs<V>> {
        if self.max_size == 0 {
            return None;
        }
        let mut inner = self.inner.lock().unwrap();
        let value = inner.entries.get(key).map(|e| e.value.clone())?;
        inner.order.retain(|k| k != key);
        inner.order.push(*key);
        Some(value)
    }

    fn set(&self, key: CacheKey, value: Outputs<V>) {
        if self.max_size == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            if let Some(oldest) = inner.order.first().copied() {
                inner.entries.remove(&oldest);
                inner.order.remove(0);
            }
        }
        inner.order.retain(|k| k != &key);
        inner.order.push(key);
        inner.entries.insert(key, LruEntry { value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_size_zero_disables_caching() {
        let cache: InMemoryCache<i64> = InMemoryCache::new(0);
        cache.set([0u8; 32], HashMap::from([("r".to_string(), 1i64)]));
        assert!(cache.get(&[0u8; 32]).is_none());
    }

    #[test]
    fn max_size_one_retains_only_last_key() {
        let cache: InMemoryCache<i64> = InMemoryCache::new(1);
        cache.set([1u8; 32], HashMap::from([("r".to_string(), 1i64)]));
        cache.set([2u8; 32], HashMap::from([("r".to_string(), 2i64)]));
        assert!(cache.get(&[1u8; 32]).is_none());
        assert!(cache.get(&[2u8; 32]).is_some());
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let cache: InMemoryCache<i64> = InMemoryCache::new(2);
        cache.set([1u8; 32], HashMap::from([("r".to_string(), 1i64)]));
        cache.set([2u8; 32], HashMap::from([("r".to_string(), 2i64)]));
        // Touch key 1 so key 2 becomes least-recently-used.
        cache.get(&[1u8; 32]);
        cache.set([3u8; 32], HashMap::from([("r".to_string(), 3i64)]));

        assert!(cache.get(&[2u8; 32]).is_none());
        assert!(cache.get(&[1u8; 32]).is_some());
        assert!(cache.get(&[3u8; 32]).is_some());
    }
}
