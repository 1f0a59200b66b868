//! TTL result cache with access-count eviction

use crate::config::CacheConfig;
use crate::size::EstimateSize;
use crate::stats::{CacheSnapshot, CacheStats};
use crate::supervisor::{StopSignal, Supervisor, WorkerStatus};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

const CLEANUP_WORKER_NAME: &str = "nrql-cache-cleanup";

/// Floor for the sweep interval so a zero setting cannot spin the worker
const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(10);

/// Entry stored in the cache
#[derive(Debug)]
struct CacheEntry<V> {
    /// Cached result
    value: Arc<V>,
    /// When this entry was created
    created_at: Instant,
    /// Lifetime of this entry
    ttl: Duration,
    /// Number of successful reads
    access_count: AtomicU64,
    /// Estimated size in bytes
    size_bytes: u64,
    /// Insertion order, breaks access-count ties
    sequence: u64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration, size_bytes: u64, sequence: u64) -> Self {
        Self {
            value: Arc::new(value),
            created_at: Instant::now(),
            ttl,
            access_count: AtomicU64::new(0),
            size_bytes,
            sequence,
        }
    }

    fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }
}

type EntryMap<V> = AHashMap<String, CacheEntry<V>>;

/// State shared between the cache handle and its cleanup worker
struct CacheInner<V> {
    entries: RwLock<EntryMap<V>>,
    config: CacheConfig,
    stats: CacheStats,
    next_sequence: AtomicU64,
}

impl<V> CacheInner<V> {
    /// Evict the entry with the lowest access count, oldest first on ties.
    ///
    /// `keep` is never chosen. Must be called with the write lock held.
    fn evict_one(&self, entries: &mut EntryMap<V>, keep: Option<&str>) -> bool {
        let victim = entries
            .iter()
            .filter(|(key, _)| Some(key.as_str()) != keep)
            .min_by_key(|(_, entry)| (entry.access_count(), entry.sequence))
            .map(|(key, _)| key.clone());

        let Some(key) = victim else {
            return false;
        };

        if let Some(entry) = entries.remove(&key) {
            self.stats.sub_memory(entry.size_bytes);
            self.stats.record_eviction();
            debug!(
                "Evicted cache entry {} ({} bytes, {} reads)",
                key,
                entry.size_bytes,
                entry.access_count()
            );
        }
        true
    }

    fn remove_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let now = Instant::now();
        let before = entries.len();

        entries.retain(|_, entry| {
            if entry.is_expired_at(now) {
                self.stats.sub_memory(entry.size_bytes);
                self.stats.record_eviction();
                self.stats.record_expiration();
                false
            } else {
                true
            }
        });

        let removed = before - entries.len();
        if removed > 0 {
            debug!("Swept {} expired cache entries", removed);
        }
        removed
    }
}

fn cleanup_loop<V>(inner: &CacheInner<V>, signal: &StopSignal) {
    while !signal.wait_timeout(inner.config.cleanup_interval) {
        inner.remove_expired();
    }
}

/// Thread-safe result cache with per-entry TTL and bounded memory.
///
/// Lookups take only the read lock. Inserts, deletes and evictions take the
/// write lock. Expired entries are removed lazily by `get` and periodically
/// by a supervised cleanup worker that stops when the cache is dropped.
pub struct ResultCache<V> {
    inner: Arc<CacheInner<V>>,
    cleanup: Option<Supervisor>,
}

impl<V> ResultCache<V>
where
    V: EstimateSize + Send + Sync + 'static,
{
    /// Create a new cache and start its cleanup worker.
    ///
    /// A `max_entries` of zero disables the cache.
    pub fn new(config: CacheConfig) -> Self {
        let mut config = config;
        if config.max_entries == 0 {
            config.enabled = false;
        }
        config.cleanup_interval = config.cleanup_interval.max(MIN_CLEANUP_INTERVAL);

        let inner = Arc::new(CacheInner {
            entries: RwLock::new(AHashMap::new()),
            config,
            stats: CacheStats::new(),
            next_sequence: AtomicU64::new(0),
        });

        let cleanup = if inner.config.enabled {
            let worker_inner = Arc::clone(&inner);
            match Supervisor::spawn(
                CLEANUP_WORKER_NAME,
                inner.config.max_cleanup_restarts,
                move |signal| cleanup_loop(&worker_inner, signal),
            ) {
                Ok(supervisor) => Some(supervisor),
                Err(e) => {
                    error!("Failed to start cache cleanup worker: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self { inner, cleanup }
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.inner.config.enabled
    }

    /// Look up a live entry and count the read.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        if !self.inner.config.enabled {
            return None;
        }

        let lookup = {
            let entries = self.inner.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_expired() => Lookup::Expired,
                Some(entry) => {
                    entry.access_count.fetch_add(1, Ordering::Relaxed);
                    Lookup::Hit(Arc::clone(&entry.value))
                }
                None => Lookup::Missing,
            }
        };

        match lookup {
            Lookup::Hit(value) => {
                self.inner.stats.record_hit();
                Some(value)
            }
            Lookup::Missing => {
                self.inner.stats.record_miss();
                None
            }
            Lookup::Expired => {
                self.remove_if_expired(key);
                self.inner.stats.record_miss();
                None
            }
        }
    }

    /// Re-check under the write lock: a concurrent `set` may have refreshed the key.
    fn remove_if_expired(&self, key: &str) {
        let mut entries = self.inner.entries.write();
        let still_expired = entries
            .get(key)
            .map(|entry| entry.is_expired())
            .unwrap_or(false);

        if still_expired {
            if let Some(entry) = entries.remove(key) {
                self.inner.stats.sub_memory(entry.size_bytes);
                self.inner.stats.record_expiration();
                debug!("Expired cache entry {}", key);
            }
        }
    }

    /// Store a value. A zero `ttl` uses the configured default.
    ///
    /// When the cache is full the least-read entry is evicted first, and after
    /// inserting, entries are evicted until memory is back under the limit.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        if !self.inner.config.enabled {
            return;
        }

        let key = key.into();
        let ttl = if ttl.is_zero() {
            self.inner.config.default_ttl
        } else {
            ttl
        };

        // Estimated outside the lock
        let size = value.estimate_size();

        if size > self.inner.config.max_memory_bytes {
            debug!(
                "Not caching {}: {} bytes exceeds the {} byte limit",
                key, size, self.inner.config.max_memory_bytes
            );
            self.delete(&key);
            return;
        }

        let sequence = self.inner.next_sequence.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry::new(value, ttl, size, sequence);

        let mut entries = self.inner.entries.write();

        if !entries.contains_key(&key) {
            while entries.len() >= self.inner.config.max_entries {
                if !self.inner.evict_one(&mut entries, None) {
                    break;
                }
            }
        }

        if let Some(previous) = entries.insert(key.clone(), entry) {
            self.inner.stats.sub_memory(previous.size_bytes);
        }
        self.inner.stats.add_memory(size);

        while self.inner.stats.memory_bytes() > self.inner.config.max_memory_bytes {
            if !self.inner.evict_one(&mut entries, Some(&key)) {
                break;
            }
        }
    }

    /// Remove an entry. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.inner.entries.write();
        match entries.remove(key) {
            Some(entry) => {
                self.inner.stats.sub_memory(entry.size_bytes);
                true
            }
            None => false,
        }
    }

    /// Remove every entry whose key starts with `prefix`
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.inner.entries.write();
        let before = entries.len();

        entries.retain(|key, entry| {
            if key.starts_with(prefix) {
                self.inner.stats.sub_memory(entry.size_bytes);
                false
            } else {
                true
            }
        });

        before - entries.len()
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        let mut entries = self.inner.entries.write();
        entries.clear();
        self.inner.stats.reset_memory();
    }

    /// Snapshot of entry count and counters
    pub fn stats(&self) -> CacheSnapshot {
        let entries = self.inner.entries.read();
        self.inner.stats.snapshot(entries.len())
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn expire_stale(&self) -> usize {
        self.inner.remove_expired()
    }

    /// State of the cleanup worker, if one was started
    pub fn cleanup_status(&self) -> Option<WorkerStatus> {
        self.cleanup.as_ref().map(Supervisor::status)
    }

    /// Stop the cleanup worker ahead of dropping the cache
    pub fn stop_cleanup(&self) {
        if let Some(cleanup) = &self.cleanup {
            cleanup.stop();
        }
    }

    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Get current estimated memory usage in bytes
    pub fn memory_used(&self) -> u64 {
        self.inner.stats.memory_bytes()
    }
}

enum Lookup<V> {
    Hit(Arc<V>),
    Missing,
    Expired,
}

impl<V> std::fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("enabled", &self.inner.config.enabled)
            .field("max_entries", &self.inner.config.max_entries)
            .field("max_memory_bytes", &self.inner.config.max_memory_bytes)
            .field("default_ttl", &self.inner.config.default_ttl)
            .field("current_entries", &self.inner.entries.read().len())
            .field("memory_used", &self.inner.stats.memory_bytes())
            .finish()
    }
}
