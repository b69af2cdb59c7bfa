//! SharedCache: an LRU cache behind a single lock
//!
//! `LruCache::get` reorders the recency list, so every operation (reads
//! included) takes the same exclusive lock. Eviction listeners run after
//! that lock is released and may call back into the cache.

use std::borrow::Borrow;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::lru::{EvictionListener, LruCache};
use crate::stats::CacheStats;

enum Listener<K, V> {
    /// Installed through `SharedCache::with_eviction_listener`
    Shared(Box<dyn Fn(K, V) + Send + Sync>),
    /// Carried over from the wrapped `LruCache`
    Exclusive(Mutex<EvictionListener<K, V>>),
}

impl<K, V> Listener<K, V> {
    fn notify(&self, key: K, value: V) {
        match self {
            Listener::Shared(listener) => listener(key, value),
            Listener::Exclusive(listener) => {
                let mut listener = listener.lock();
                (*listener)(key, value)
            }
        }
    }
}

/// Thread-safe LRU cache with hit/miss statistics
///
/// Share it with `Arc<SharedCache<K, V>>`. Values are cloned out on `get`.
pub struct SharedCache<K, V> {
    /// Recency-ordered entries
    cache: Mutex<LruCache<K, V>>,

    /// Cache statistics
    stats: CacheStats,

    /// Receives entries evicted by `put`, outside the cache lock
    on_evict: Option<Listener<K, V>>,
}

impl<K, V> SharedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a shared cache holding at most `capacity` entries
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::from_cache(LruCache::new(capacity))
    }

    /// Create a shared cache, rejecting a zero capacity
    pub fn try_new(capacity: usize) -> Result<Self> {
        Ok(Self::from_cache(LruCache::try_new(capacity)?))
    }

    /// Wrap an existing cache, taking over its eviction listener
    ///
    /// The listener is called after the cache lock is released, so it may
    /// use this `SharedCache` (`remove`, `contains`, `len`, ...).
    ///
    /// # Deadlocks
    /// A `FnMut` listener is serialized behind its own lock. If it calls
    /// `put` on this cache and that `put` evicts again, it deadlocks. Use
    /// [`SharedCache::with_eviction_listener`] for listeners that insert.
    pub fn from_cache(mut cache: LruCache<K, V>) -> Self {
        let on_evict = cache
            .take_eviction_listener()
            .map(|listener| Listener::Exclusive(Mutex::new(listener)));
        Self {
            cache: Mutex::new(cache),
            stats: CacheStats::new(),
            on_evict,
        }
    }

    /// Install a listener receiving every entry that `put` evicts
    ///
    /// Runs outside the cache lock and may re-enter this cache freely.
    pub fn with_eviction_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        self.on_evict = Some(Listener::Shared(Box::new(listener)));
        self
    }

    /// Get a clone of a value, marking it most recently used
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.cache.lock().get(key).cloned();
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    /// Insert or replace a value, evicting the LRU entry when full
    pub fn put(&self, key: K, value: V) {
        let evicted = self.cache.lock().push(key, value);
        self.stats.record_insert();

        if let Some((evicted_key, evicted_value)) = evicted {
            self.stats.record_eviction();
            if let Some(listener) = &self.on_evict {
                listener.notify(evicted_key, evicted_value);
            }
        }
    }

    /// Remove a key, returning its value
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cache.lock().remove(key)
    }

    /// Check for a key without touching the recency order or statistics
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cache.lock().contains(key)
    }

    /// Return the cached value, or produce it with `load` and cache it
    ///
    /// The loader runs without holding the lock, so concurrent misses on the
    /// same key may each load; the last one to finish wins. A failed load
    /// leaves the cache untouched.
    pub fn get_or_load<F, E>(&self, key: K, load: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        match load() {
            Ok(value) => {
                self.put(key, value.clone());
                Ok(value)
            }
            Err(e) => {
                debug!("cache loader failed, nothing cached");
                Err(e)
            }
        }
    }

    /// Drop every entry and reset statistics
    pub fn clear(&self) {
        self.cache.lock().clear();
        self.stats.reset();
    }
}

impl<K, V> SharedCache<K, V> {
    /// Cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Current number of cached entries
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Cache capacity
    pub fn capacity(&self) -> usize {
        self.cache.lock().capacity()
    }
}
