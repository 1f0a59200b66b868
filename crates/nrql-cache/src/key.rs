//! Cache key construction
//!
//! Keys are `prefix:part:part:name=value:...` with parameters sorted by name,
//! so the same query with the same parameters always maps to the same key.
//! Keys longer than [`MAX_KEY_LENGTH`] are replaced by `prefix:` plus a
//! 128-bit hash of the full key.

use ahash::RandomState;
use std::collections::BTreeMap;

/// Longest key stored verbatim
pub const MAX_KEY_LENGTH: usize = 250;

/// Prefix used for validated NRQL query results
pub const QUERY_KEY_PREFIX: &str = "nrql";

const SEPARATOR: char = ':';

// Fixed seeds so hashed keys are stable across processes
const SEEDS_LOW: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];
const SEEDS_HIGH: [u64; 4] = [
    0x4528_21e6_38d0_1377,
    0xbe54_66cf_34e9_0c6c,
    0xc0ac_29b7_c97c_50dd,
    0x3f84_d5b5_b547_0917,
];

/// Builder for deterministic cache keys
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    prefix: String,
    parts: Vec<String>,
    params: BTreeMap<String, String>,
}

impl CacheKeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            parts: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    /// Append a positional component
    pub fn part(mut self, part: impl AsRef<str>) -> Self {
        self.parts.push(escape(part.as_ref(), true));
        self
    }

    /// Add a named parameter. Setting the same name twice keeps the last value.
    pub fn param(mut self, name: impl AsRef<str>, value: impl ToString) -> Self {
        self.params.insert(
            escape(name.as_ref(), true),
            escape(&value.to_string(), false),
        );
        self
    }

    pub fn build(&self) -> String {
        let mut key = escape(&self.prefix, false);

        for part in &self.parts {
            key.push(SEPARATOR);
            key.push_str(part);
        }

        for (name, value) in &self.params {
            key.push(SEPARATOR);
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }

        if key.len() > MAX_KEY_LENGTH {
            return hashed_key(&self.prefix, &key);
        }
        key
    }
}

/// Key for the result of a sanitized query run with `params`
pub fn query_cache_key(sanitized: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(
            CacheKeyBuilder::new(QUERY_KEY_PREFIX).part(sanitized),
            |builder, (name, value)| builder.param(name, value),
        )
        .build()
}

/// Parts and parameter names also escape `=` so neither can pose as a parameter
fn escape(raw: &str, escape_equals: bool) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || c == SEPARATOR || (escape_equals && c == '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn hashed_key(prefix: &str, full_key: &str) -> String {
    let [a, b, c, d] = SEEDS_LOW;
    let low = RandomState::with_seeds(a, b, c, d).hash_one(full_key);
    let [a, b, c, d] = SEEDS_HIGH;
    let high = RandomState::with_seeds(a, b, c, d).hash_one(full_key);

    format!("{}{}{:016x}{:016x}", escape(prefix, false), SEPARATOR, high, low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_and_params() {
        let key = CacheKeyBuilder::new("nrql")
            .part("SELECT count(*) FROM Transaction")
            .param("account", 42)
            .build();

        assert_eq!(key, "nrql:SELECT count(*) FROM Transaction:account=42");
    }

    #[test]
    fn test_param_order_does_not_matter() {
        let first = CacheKeyBuilder::new("nrql")
            .part("q")
            .param("b", "2")
            .param("a", "1")
            .build();
        let second = CacheKeyBuilder::new("nrql")
            .part("q")
            .param("a", "1")
            .param("b", "2")
            .build();

        assert_eq!(first, second);
        assert_eq!(first, "nrql:q:a=1:b=2");
    }

    #[test]
    fn test_separator_is_escaped() {
        let joined = CacheKeyBuilder::new("p").part("a:b").build();
        let split = CacheKeyBuilder::new("p").part("a").part("b").build();

        assert_ne!(joined, split);
        assert_eq!(joined, "p:a\\:b");
    }

    #[test]
    fn test_part_cannot_pose_as_param() {
        let part = CacheKeyBuilder::new("p").part("a=1").build();
        let param = CacheKeyBuilder::new("p").param("a", "1").build();

        assert_ne!(part, param);
        assert_eq!(part, "p:a\\=1");
        assert_eq!(param, "p:a=1");
    }

    #[test]
    fn test_long_keys_are_hashed() {
        let query = format!("SELECT * FROM Transaction WHERE name = '{}'", "x".repeat(400));
        let key = CacheKeyBuilder::new("nrql").part(&query).build();

        assert!(key.starts_with("nrql:"));
        assert_eq!(key.len(), "nrql:".len() + 32);
        assert!(key.len() <= MAX_KEY_LENGTH);

        // Stable for the same input, distinct for different input
        assert_eq!(key, CacheKeyBuilder::new("nrql").part(&query).build());
        let other = CacheKeyBuilder::new("nrql").part(format!("{} ", query)).build();
        assert_ne!(key, other);
    }

    #[test]
    fn test_query_cache_key() {
        let key = query_cache_key("SELECT count(*) FROM Transaction", &[("since", "1 hour ago")]);
        assert_eq!(key, "nrql:SELECT count(*) FROM Transaction:since=1 hour ago");

        let bare = query_cache_key("SELECT count(*) FROM Transaction", &[]);
        assert_eq!(bare, "nrql:SELECT count(*) FROM Transaction");
    }
}
