//! Guarded Query Example
//!
//! Validates incoming NRQL, keys the result cache by the sanitized query and
//! serves repeated queries from the cache.

use anyhow::Result;
use nrql_cache::{query_cache_key, CacheConfig, CacheInvalidator, ResultCache};
use nrql_validator::NrqlValidator;
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("nrql_cache=debug,nrql_validator=debug")
        .init();

    println!("=== Guarded Query Example ===\n");

    let validator = NrqlValidator::default();
    let cache: ResultCache<Value> = ResultCache::new(
        CacheConfig::default()
            .with_max_entries(100)
            .with_cleanup_interval(Duration::from_millis(200)),
    );

    // Example 1: Validate then cache
    validate_and_cache(&validator, &cache)?;

    // Example 2: Rejected input never reaches the cache
    rejected_queries(&validator, &cache);

    // Example 3: TTL expiry and invalidation
    expiry_and_invalidation(&validator, &cache)?;

    let stats = cache.stats();
    println!("\n--- Final Statistics ---\n");
    println!("  Entries:     {}", stats.entries);
    println!("  Memory:      {} bytes", stats.memory_bytes);
    println!("  Hits:        {}", stats.hits);
    println!("  Misses:      {}", stats.misses);
    println!("  Hit rate:    {:.1}%", stats.hit_rate() * 100.0);
    println!("  Evictions:   {}", stats.evictions);
    println!("  Expirations: {}", stats.expirations);

    println!("\n=== Guarded query example completed! ===");
    Ok(())
}

/// Stand-in for a call to the query backend
fn run_backend(query: &str, event_types: &[String]) -> Value {
    json!({
        "query": query,
        "results": event_types
            .iter()
            .map(|event_type| json!({"eventType": event_type, "count": event_type.len() * 100}))
            .collect::<Vec<_>>(),
    })
}

fn fetch(
    validator: &NrqlValidator,
    cache: &ResultCache<Value>,
    raw: &str,
    ttl: Duration,
) -> Result<bool> {
    let sanitized = validator.sanitize(raw)?;
    let key = query_cache_key(&sanitized, &[("account", "12345")]);

    if cache.get(&key).is_some() {
        return Ok(true);
    }

    let event_types = validator.extract_event_types(&sanitized)?;
    cache.set(key, run_backend(&sanitized, &event_types), ttl);
    Ok(false)
}

fn validate_and_cache(validator: &NrqlValidator, cache: &ResultCache<Value>) -> Result<()> {
    println!("--- Example 1: Validate and Cache ---\n");

    let queries = [
        "SELECT count(*) FROM Transaction SINCE 1 hour ago",
        "SELECT   count(*)\n  FROM Transaction   SINCE 1 hour ago",
        "SELECT uniqueCount(session) FROM PageView, BrowserInteraction",
    ];

    for raw in queries {
        let hit = fetch(validator, cache, raw, Duration::from_secs(60))?;
        println!(
            "  {} {}",
            if hit { "HIT " } else { "MISS" },
            raw.replace('\n', " ")
        );
    }

    Ok(())
}

fn rejected_queries(validator: &NrqlValidator, cache: &ResultCache<Value>) {
    println!("\n--- Example 2: Rejected Queries ---\n");

    let before = cache.len();
    for raw in [
        "",
        "SELECT * FROM Transaction; DROP TABLE users",
        "SELECT * FROM Transaction WHERE name = '' or '1'='1'",
        "SELECT count(* FROM Transaction",
        "FROM Transaction SELECT count(*)",
    ] {
        match validator.sanitize(raw) {
            Ok(query) => println!("  accepted unexpectedly: {}", query),
            Err(e) => println!("  {:<24} {}", e.code(), e),
        }
    }
    assert_eq!(cache.len(), before);
}

fn expiry_and_invalidation(validator: &NrqlValidator, cache: &ResultCache<Value>) -> Result<()> {
    println!("\n--- Example 3: Expiry and Invalidation ---\n");

    let raw = "SELECT average(duration) FROM Transaction FACET name";
    fetch(validator, cache, raw, Duration::from_millis(100))?;
    println!("  Cached with 100ms TTL, entries: {}", cache.len());

    // Let the cleanup worker sweep it
    thread::sleep(Duration::from_millis(500));
    println!("  After 500ms, entries: {}", cache.len());

    let removed = cache.invalidate_prefix("nrql:");
    println!("  Invalidated {} remaining entries", removed);

    Ok(())
}
