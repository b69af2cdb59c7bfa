//! LRU (Least Recently Used) cache implementation
//!
//! Entries live in a slab of slots threaded into a doubly-linked recency
//! list. The map only stores slot indices, so promoting or evicting an entry
//! is O(1) and never moves a value.
//!
//! ```text
//!   head (MRU)                               tail (LRU)
//!      │                                         │
//!      ▼                                         ▼
//!   [slot 3] ⇄ [slot 0] ⇄ [slot 2] ⇄ ... ⇄ [slot 1]
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::iter::FusedIterator;

use ahash::RandomState;
use tracing::{debug, trace};

use crate::error::{Error, Result};

pub(crate) type EvictionListener<K, V> = Box<dyn FnMut(K, V) + Send>;

struct Node<K, V> {
    key: K,
    value: V,
    /// Neighbour towards the MRU end
    prev: Option<usize>,
    /// Neighbour towards the LRU end
    next: Option<usize>,
}

/// Fixed-capacity cache that evicts the least recently used entry
///
/// `get` and `put` promote the touched key to most recently used.
/// `contains`, `peek` and iteration never change the recency order.
pub struct LruCache<K, V> {
    map: HashMap<K, usize, RandomState>,
    slots: Vec<Option<Node<K, V>>>,
    head: Option<usize>,
    tail: Option<usize>,
    vacant: Vec<usize>,
    capacity: usize,
    on_evict: Option<EvictionListener<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU cache holding at most `capacity` entries
    ///
    /// # Panics
    /// Panics if `capacity` is zero. Use [`LruCache::try_new`] when the
    /// capacity comes from configuration.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");
        Self::with_slots(capacity)
    }

    /// Create a new LRU cache, rejecting a zero capacity
    pub fn try_new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        Ok(Self::with_slots(capacity))
    }

    fn with_slots(capacity: usize) -> Self {
        debug!(capacity, "creating lru cache");
        Self {
            map: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            slots: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            vacant: Vec::new(),
            capacity,
            on_evict: None,
        }
    }

    /// Install a listener receiving every entry that `put` evicts
    pub fn with_eviction_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(K, V) + Send + 'static,
    {
        self.set_eviction_listener(listener);
        self
    }

    /// Replace the eviction listener
    pub fn set_eviction_listener<F>(&mut self, listener: F)
    where
        F: FnMut(K, V) + Send + 'static,
    {
        self.on_evict = Some(Box::new(listener));
    }

    pub(crate) fn take_eviction_listener(&mut self) -> Option<EvictionListener<K, V>> {
        self.on_evict.take()
    }

    /// Get a value and mark it most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.touch(idx);
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    /// Mutable variant of [`LruCache::get`], with the same recency bump
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.touch(idx);
        self.slots[idx].as_mut().map(|node| &mut node.value)
    }

    /// Get a value without touching the recency order
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    /// Check for a key without touching the recency order
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Insert a key-value pair and mark it most recently used
    ///
    /// Re-inserting an existing key replaces its value and never evicts.
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry first; the evicted pair goes to the eviction listener if one is
    /// installed and is dropped otherwise.
    pub fn put(&mut self, key: K, value: V) {
        if let Some((evicted_key, evicted_value)) = self.push(key, value) {
            if let Some(listener) = self.on_evict.as_mut() {
                listener(evicted_key, evicted_value);
            }
        }
    }

    /// Like [`LruCache::put`], but hands the evicted entry back to the caller
    ///
    /// The eviction listener is not invoked.
    pub fn push(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.map.get(&key) {
            if let Some(node) = self.slots[idx].as_mut() {
                node.value = value;
            }
            self.touch(idx);
            return None;
        }

        let evicted = if self.map.len() >= self.capacity {
            trace!(capacity = self.capacity, "evicting least recently used entry");
            self.pop_lru()
        } else {
            None
        };

        let idx = self.alloc(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.attach_front(idx);
        self.map.insert(key, idx);

        evicted
    }

    /// Remove a key from the cache, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.release(idx).map(|node| node.value)
    }

    /// Remove and return the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let idx = self.tail?;
        let node = self.release(idx)?;
        self.map.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Drop every entry; capacity and eviction listener are kept
    pub fn clear(&mut self) {
        debug!(dropped = self.map.len(), "clearing lru cache");
        self.map.clear();
        self.slots.clear();
        self.vacant.clear();
        self.head = None;
        self.tail = None;
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.vacant.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> Option<Node<K, V>> {
        self.detach(idx);
        let node = self.slots[idx].take()?;
        self.vacant.push(idx);
        Some(node)
    }
}

impl<K, V> LruCache<K, V> {
    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries, fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The entry the next eviction would remove, without touching it
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let node = self.slots[self.tail?].as_ref()?;
        Some((&node.key, &node.value))
    }

    /// Iterate entries from most to least recently used
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
            remaining: self.map.len(),
        }
    }

    /// Iterate keys from most to least recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    fn touch(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.attach_front(idx);
    }

    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = None;
            node.next = old_head;
        }

        match old_head {
            Some(head_idx) => {
                if let Some(head) = self.slots[head_idx].as_mut() {
                    head.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_mut() {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = self.slots[prev_idx].as_mut() {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = self.slots[next_idx].as_mut() {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("entries", &DebugEntries(self))
            .finish()
    }
}

struct DebugEntries<'a, K, V>(&'a LruCache<K, V>);

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for DebugEntries<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Iterator over cache entries, most recently used first
pub struct Iter<'a, K, V> {
    slots: &'a [Option<Node<K, V>>],
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.slots[self.cursor?].as_ref()?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a LruCache<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
