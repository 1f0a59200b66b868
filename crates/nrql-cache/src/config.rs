//! Cache configuration options

use nrql_core::CacheSettings;
use std::time::Duration;

/// Configuration for the result cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache; zero disables caching
    pub max_entries: usize,
    /// Maximum estimated memory usage in bytes
    pub max_memory_bytes: u64,
    /// TTL used when `set` is called with a zero TTL
    pub default_ttl: Duration,
    /// How often the background worker sweeps expired entries
    pub cleanup_interval: Duration,
    /// How many times a panicking cleanup worker is restarted
    pub max_cleanup_restarts: u32,
    /// Whether caching is enabled
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_memory_bytes: 100 * 1024 * 1024, // 100 MB
            default_ttl: Duration::from_secs(300), // 5 minutes
            cleanup_interval: Duration::from_secs(60),
            max_cleanup_restarts: 3,
            enabled: true,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            max_entries: settings.max_entries,
            max_memory_bytes: settings.max_memory_bytes,
            default_ttl: Duration::from_secs(settings.default_ttl_secs),
            cleanup_interval: Duration::from_secs(settings.cleanup_interval_secs),
            max_cleanup_restarts: settings.max_cleanup_restarts,
            enabled: settings.enabled,
        }
    }
}

impl CacheConfig {
    /// Create a disabled cache configuration
    pub fn disabled() -> Self {
        Self::default().with_enabled(false)
    }

    /// Set the maximum number of entries
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the maximum memory usage
    pub fn with_max_memory(mut self, max_memory_bytes: u64) -> Self {
        self.max_memory_bytes = max_memory_bytes;
        self
    }

    /// Set the default TTL
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the background sweep interval
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Enable or disable the cache
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.max_memory_bytes, 100 * 1024 * 1024);
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));
        assert_eq!(config.max_cleanup_restarts, 3);
        assert!(config.enabled);
    }

    #[test]
    fn test_disabled_config() {
        let config = CacheConfig::disabled();
        assert!(!config.enabled);
    }

    #[test]
    fn test_builder_pattern() {
        let config = CacheConfig::default()
            .with_max_entries(500)
            .with_max_memory(50 * 1024 * 1024)
            .with_default_ttl(Duration::from_secs(60))
            .with_cleanup_interval(Duration::from_millis(250))
            .with_enabled(true);

        assert_eq!(config.max_entries, 500);
        assert_eq!(config.max_memory_bytes, 50 * 1024 * 1024);
        assert_eq!(config.default_ttl, Duration::from_secs(60));
        assert_eq!(config.cleanup_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_from_settings() {
        let settings = CacheSettings {
            max_entries: 10,
            default_ttl_secs: 5,
            cleanup_interval_secs: 2,
            ..Default::default()
        };
        let config = CacheConfig::from(&settings);
        assert_eq!(config.max_entries, 10);
        assert_eq!(config.default_ttl, Duration::from_secs(5));
        assert_eq!(config.cleanup_interval, Duration::from_secs(2));
    }
}
