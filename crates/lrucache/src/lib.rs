//! # lrucache
//!
//! Fixed-capacity, in-memory key/value cache with least-recently-used
//! eviction, meant to sit in front of an expensive storage layer.
//!
//! ## Architecture
//! - **HashMap**: AHash keyed map from key to slot index (O(1))
//! - **LRU List**: index-linked doubly-linked list over a slot slab (O(1))
//! - **SharedCache**: single-lock wrapper with hit/miss statistics
//!
//! ```
//! use lrucache::LruCache;
//!
//! let mut cache = LruCache::new(2);
//! cache.put("a", 1);
//! cache.put("b", 2);
//! cache.get("a");
//! cache.put("c", 3); // "b" was least recently used
//!
//! assert!(!cache.contains("b"));
//! assert_eq!(cache.len(), 2);
//! ```

#![warn(missing_docs)]

mod error;
mod lru;
mod shared;
mod stats;

pub use error::{Error, Result};
pub use lru::{Iter, LruCache};
pub use shared::SharedCache;
pub use stats::{CacheStats, StatsSnapshot};
