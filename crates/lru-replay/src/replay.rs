//! Applies parsed workload commands to an LRU cache

use lrucache::{CacheStats, LruCache, Result};
use tracing::debug;

use crate::workload::Command;

/// Replays commands against a string cache and keeps statistics
pub struct Replay {
    cache: LruCache<String, String>,
    stats: CacheStats,
}

impl Replay {
    /// Create a replay target; zero capacity is rejected
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            cache: LruCache::try_new(capacity)?,
            stats: CacheStats::new(),
        })
    }

    /// Apply one command, returning its report line
    pub fn apply(&mut self, command: Command) -> String {
        match command {
            Command::Put { key, value } => {
                let line = format!("put {} {}", key, value);
                self.stats.record_insert();
                match self.cache.push(key, value) {
                    Some((evicted_key, evicted_value)) => {
                        self.stats.record_eviction();
                        debug!(key = %evicted_key, "evicted least recently used entry");
                        format!("{} (evicted {}={})", line, evicted_key, evicted_value)
                    }
                    None => line,
                }
            }
            Command::Get(key) => match self.cache.get(&key) {
                Some(value) => {
                    self.stats.record_hit();
                    format!("get {} -> {}", key, value)
                }
                None => {
                    self.stats.record_miss();
                    format!("get {} -> (nil)", key)
                }
            },
            Command::Remove(key) => match self.cache.remove(&key) {
                Some(value) => format!("remove {} -> {}", key, value),
                None => format!("remove {} -> (nil)", key),
            },
            Command::Contains(key) => {
                format!("contains {} -> {}", key, self.cache.contains(&key))
            }
        }
    }

    /// One-line summary of the final cache state and counters
    pub fn summary(&self) -> String {
        format!(
            "capacity={} entries={} {}",
            self.cache.capacity(),
            self.cache.len(),
            self.stats.snapshot()
        )
    }

    /// Keys currently cached, most recently used first
    pub fn keys(&self) -> Vec<&str> {
        self.cache.keys().map(String::as_str).collect()
    }
}
