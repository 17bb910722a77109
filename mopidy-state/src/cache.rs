//! Bounded least-recently-used metadata cache

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

/// Thread-safe LRU cache keyed by content uri
///
/// Both `get` and `set` mark a key as most recently used. Inserting a new key
/// into a full cache evicts the least recently used key first.
pub struct MetadataCache<V> {
    inner: Mutex<CacheInner<V>>,
    capacity: usize,
}

struct CacheInner<V> {
    entries: HashMap<String, (V, u64)>,
    // Recency stamp -> key, oldest first
    order: BTreeMap<u64, String>,
    tick: u64,
}

impl<V> CacheInner<V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

impl<V: Clone> MetadataCache<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                tick: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        let (value, stamp) = inner.entries.get_mut(key)?;
        let old = std::mem::replace(stamp, tick);
        let value = value.clone();
        inner.order.remove(&old);
        inner.order.insert(tick, key.to_string());
        Some(value)
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();

        if let Some((_, old)) = inner.entries.remove(&key) {
            inner.order.remove(&old);
        } else if inner.entries.len() >= self.capacity {
            if let Some((_, oldest)) = inner.order.pop_first() {
                tracing::trace!("Evicting {} from metadata cache", oldest);
                inner.entries.remove(&oldest);
            }
        }

        inner.order.insert(tick, key.clone());
        inner.entries.insert(key, (value, tick));
    }

    /// Presence check that does not touch recency
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

impl<V> std::fmt::Debug for MetadataCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("len", &self.inner.lock().entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
