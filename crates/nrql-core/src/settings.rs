//! Externally supplied settings
//!
//! Settings are read once at startup, from an optional JSON file and then the
//! process environment, and converted into plain configuration values. Nothing
//! re-reads them afterwards.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const ENV_MAX_QUERY_LENGTH: &str = "NRQL_GUARD_MAX_QUERY_LENGTH";
pub const ENV_CACHE_ENABLED: &str = "NRQL_GUARD_CACHE_ENABLED";
pub const ENV_CACHE_MAX_ENTRIES: &str = "NRQL_GUARD_CACHE_MAX_ENTRIES";
pub const ENV_CACHE_MAX_MEMORY_BYTES: &str = "NRQL_GUARD_CACHE_MAX_MEMORY_BYTES";
pub const ENV_CACHE_DEFAULT_TTL_SECS: &str = "NRQL_GUARD_CACHE_DEFAULT_TTL_SECS";
pub const ENV_CACHE_CLEANUP_INTERVAL_SECS: &str = "NRQL_GUARD_CACHE_CLEANUP_INTERVAL_SECS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub validator: ValidatorSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSettings {
    pub max_query_length: usize,
    pub max_identifier_length: usize,
    pub max_string_value_length: usize,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            max_query_length: 10_000,
            max_identifier_length: 255,
            max_string_value_length: 4_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_entries: usize,
    pub max_memory_bytes: u64,
    pub default_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub max_cleanup_restarts: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            max_memory_bytes: 100 * 1024 * 1024, // 100 MB
            default_ttl_secs: 300,
            cleanup_interval_secs: 60,
            max_cleanup_restarts: 3,
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override fields from an arbitrary variable lookup.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, ENV_MAX_QUERY_LENGTH)? {
            self.validator.max_query_length = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_CACHE_ENABLED)? {
            self.cache.enabled = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_CACHE_MAX_ENTRIES)? {
            self.cache.max_entries = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_CACHE_MAX_MEMORY_BYTES)? {
            self.cache.max_memory_bytes = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_CACHE_DEFAULT_TTL_SECS)? {
            self.cache.default_ttl_secs = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_CACHE_CLEANUP_INTERVAL_SECS)? {
            self.cache.cleanup_interval_secs = v;
        }
        Ok(self)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    match trimmed.parse::<T>() {
        Ok(value) => {
            debug!("Setting override from {}={}", name, trimmed);
            Ok(Some(value))
        }
        Err(_) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.validator.max_query_length, 10_000);
        assert_eq!(settings.validator.max_identifier_length, 255);
        assert_eq!(settings.validator.max_string_value_length, 4_000);
        assert_eq!(settings.cache.max_entries, 1000);
        assert_eq!(settings.cache.max_memory_bytes, 100 * 1024 * 1024);
        assert_eq!(settings.cache.default_ttl_secs, 300);
        assert_eq!(settings.cache.cleanup_interval_secs, 60);
        assert!(settings.cache.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::default()
            .apply_overrides(lookup_from(&[
                (ENV_CACHE_MAX_ENTRIES, "50"),
                (ENV_CACHE_DEFAULT_TTL_SECS, " 30 "),
                (ENV_CACHE_ENABLED, "false"),
            ]))
            .unwrap();

        assert_eq!(settings.cache.max_entries, 50);
        assert_eq!(settings.cache.default_ttl_secs, 30);
        assert!(!settings.cache.enabled);
        // untouched
        assert_eq!(settings.cache.cleanup_interval_secs, 60);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let err = Settings::default()
            .apply_overrides(lookup_from(&[(ENV_CACHE_MAX_MEMORY_BYTES, "lots")]))
            .unwrap_err();

        match err {
            ConfigError::InvalidValue { name, value } => {
                assert_eq!(name, ENV_CACHE_MAX_MEMORY_BYTES);
                assert_eq!(value, "lots");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.cache.max_entries = 42;
        settings.save(&path).unwrap();

        let loaded = Settings::from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "cache": { "max_entries": 7 } }"#).unwrap();

        let loaded = Settings::from_file(&path).unwrap();
        assert_eq!(loaded.cache.max_entries, 7);
        assert_eq!(loaded.cache.default_ttl_secs, 300);
        assert_eq!(loaded.validator, ValidatorSettings::default());
    }
}
