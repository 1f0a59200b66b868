//! Adaptive result cache for validated NRQL queries
//!
//! This crate provides a bounded in-memory cache for query results.
//!
//! # Features
//!
//! - **TTL Support**: Every entry carries its own time-to-live
//! - **Entry and Memory Limits**: Least-read entries are evicted to stay under both
//! - **Thread-Safe**: Concurrent readers share a `RwLock`
//! - **Background Cleanup**: A supervised worker sweeps expired entries
//! - **Statistics**: Hits, misses, evictions, expirations and memory use
//! - **Invalidation**: Drop single keys, key prefixes or everything
//!
//! # Example
//!
//! ```
//! use nrql_cache::{query_cache_key, CacheConfig, ResultCache};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let cache = ResultCache::new(CacheConfig::default());
//! let key = query_cache_key("SELECT count(*) FROM Transaction", &[]);
//!
//! if cache.get(&key).is_none() {
//!     cache.set(key.clone(), json!({"count": 42}), Duration::from_secs(60));
//! }
//! assert_eq!(cache.get(&key).unwrap()["count"], 42);
//! ```

pub mod cache;
pub mod config;
pub mod invalidation;
pub mod key;
pub mod size;
pub mod stats;
pub mod supervisor;

pub use cache::ResultCache;
pub use config::CacheConfig;
pub use invalidation::CacheInvalidator;
pub use key::{query_cache_key, CacheKeyBuilder, MAX_KEY_LENGTH};
pub use size::EstimateSize;
pub use stats::{CacheSnapshot, CacheStats};
pub use supervisor::{StopSignal, Supervisor, WorkerStatus};
