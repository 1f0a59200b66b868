use crate::commands::{rejected, validator_from};
use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{Cell, Color, Table as ComfyTable};
use nrql_cache::{query_cache_key, CacheConfig, ResultCache};
use nrql_core::Settings;
use nrql_validator::NrqlValidator;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Result of running one query through the session
pub enum QueryOutcome {
    /// Served from the cache
    Cached(Arc<Value>),
    /// Not cached yet; the summary was computed and stored
    Stored(Arc<Value>),
}

/// Validator plus cache, independent of the terminal
pub struct QuerySession {
    validator: NrqlValidator,
    cache: ResultCache<Value>,
}

impl QuerySession {
    pub fn new(settings: &Settings) -> Self {
        Self {
            validator: validator_from(settings),
            cache: ResultCache::new(CacheConfig::from(&settings.cache)),
        }
    }

    pub fn cache(&self) -> &ResultCache<Value> {
        &self.cache
    }

    /// Sanitize, key and look up a query, storing a local summary on miss
    pub fn run(&self, query: &str) -> Result<QueryOutcome> {
        let sanitized = self.validator.sanitize(query).map_err(rejected)?;
        let key = query_cache_key(&sanitized, &[]);

        if let Some(cached) = self.cache.get(&key) {
            return Ok(QueryOutcome::Cached(cached));
        }

        let summary = self.summarize(&sanitized);
        self.cache.set(key.clone(), summary.clone(), Duration::ZERO);
        debug!("Stored summary under {}", key);

        Ok(QueryOutcome::Stored(Arc::new(summary)))
    }

    /// Drop the cached result for a query. Returns whether one was cached.
    pub fn forget(&self, query: &str) -> Result<bool> {
        let sanitized = self.validator.sanitize(query).map_err(rejected)?;
        Ok(self.cache.delete(&query_cache_key(&sanitized, &[])))
    }

    fn summarize(&self, sanitized: &str) -> Value {
        let event_types = match self.validator.extract_event_types(sanitized) {
            Ok(event_types) => event_types,
            Err(e) => {
                warn!("Could not extract event types: {}", e);
                Vec::new()
            }
        };

        let stored_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);

        json!({
            "query": sanitized,
            "event_types": event_types,
            "stored_at": stored_at,
        })
    }
}

enum Flow {
    Continue,
    Quit,
}

pub struct Repl {
    session: QuerySession,
    editor: DefaultEditor,
    history_file: PathBuf,
}

impl Repl {
    pub fn new(settings: &Settings) -> Result<Self> {
        let history_file = Self::get_history_file()?;
        let mut editor = DefaultEditor::new()?;

        // Load history
        let _ = editor.load_history(&history_file);

        Ok(Self {
            session: QuerySession::new(settings),
            editor,
            history_file,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        println!("{}", "Interactive NRQL REPL".bright_green().bold());
        println!("{}", "Commands:".bright_yellow());
        println!("  {}  - Show available commands", ".help".bright_cyan());
        println!("  {} - Show cache statistics", ".stats".bright_cyan());
        println!("  {}  - Exit the REPL", ".quit".bright_cyan());
        println!();

        loop {
            let prompt = format!("{} ", "nrql>".bright_green().bold());
            let readline = self.editor.readline(&prompt);

            match readline {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    self.editor.add_history_entry(line)?;

                    match self.handle_input(line) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => break,
                        Err(e) => eprintln!("{} {}", "Error:".bright_red().bold(), e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".bright_yellow());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "exit".bright_yellow());
                    break;
                }
                Err(err) => {
                    eprintln!("{} {:?}", "Error:".bright_red().bold(), err);
                    break;
                }
            }
        }

        // Save history
        self.editor.save_history(&self.history_file)?;
        self.session.cache().stop_cleanup();

        println!("{}", "Goodbye!".bright_cyan());
        Ok(())
    }

    fn handle_input(&mut self, input: &str) -> Result<Flow> {
        if input.starts_with('.') {
            self.handle_command(input)
        } else {
            self.handle_query(input)?;
            Ok(Flow::Continue)
        }
    }

    fn handle_command(&mut self, cmd: &str) -> Result<Flow> {
        let (name, rest) = cmd.split_once(' ').unwrap_or((cmd, ""));

        match name {
            ".help" | ".h" => self.show_help(),
            ".quit" | ".q" | ".exit" => return Ok(Flow::Quit),
            ".stats" => self.show_cache_stats(),
            ".clear" => {
                self.session.cache().clear();
                println!("{} Cache cleared", "✓".bright_green());
            }
            ".expire" => {
                let removed = self.session.cache().expire_stale();
                println!("{} Removed {} expired entries", "✓".bright_green(), removed);
            }
            ".delete" => {
                if rest.trim().is_empty() {
                    anyhow::bail!("Usage: .delete <query>");
                }
                if self.session.forget(rest)? {
                    println!("{} Cached result removed", "✓".bright_green());
                } else {
                    println!("{} Query was not cached", "→".bright_blue());
                }
            }
            _ => {
                anyhow::bail!(
                    "Unknown command: {}. Type .help for available commands",
                    name
                );
            }
        }

        Ok(Flow::Continue)
    }

    fn handle_query(&self, query: &str) -> Result<()> {
        let start = Instant::now();
        let outcome = self.session.run(query)?;
        let elapsed = start.elapsed();

        let (label, value) = match &outcome {
            QueryOutcome::Cached(value) => ("✓ Cache hit".bright_green(), value),
            QueryOutcome::Stored(value) => ("→ Cache miss, summary stored".bright_blue(), value),
        };

        println!("{}", label);
        println!("{}", serde_json::to_string_pretty(&**value)?);
        println!(
            "{} {:.2}ms",
            "Lookup time:".bright_yellow(),
            elapsed.as_secs_f64() * 1000.0
        );

        Ok(())
    }

    fn show_help(&self) {
        let mut table = ComfyTable::new();
        table.set_header(vec![
            Cell::new("Command").fg(Color::Cyan),
            Cell::new("Description").fg(Color::Yellow),
        ]);

        let commands = vec![
            (".help, .h", "Show this help message"),
            (".quit, .q, .exit", "Exit the REPL"),
            (".stats", "Show cache statistics"),
            (".clear", "Remove every cached result"),
            (".expire", "Sweep expired entries now"),
            (".delete <query>", "Remove the cached result of a query"),
        ];

        for (cmd, desc) in commands {
            table.add_row(vec![cmd, desc]);
        }

        println!("{}", table);
        println!();
        println!("{}", "Queries:".bright_yellow().bold());
        println!("  Any other input is validated as NRQL, e.g.");
        println!("  SELECT count(*) FROM Transaction SINCE 1 hour ago");
        println!();
    }

    fn show_cache_stats(&self) {
        let cache = self.session.cache();
        let stats = cache.stats();

        println!();
        println!("{}", "Result Cache Statistics".bright_yellow().bold());
        println!();

        let mut table = ComfyTable::new();
        table.set_header(vec![
            Cell::new("Metric").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Green),
        ]);

        table.add_row(vec![
            "Enabled",
            if cache.is_enabled() { "Yes" } else { "No" },
        ]);
        table.add_row(vec!["Entries", &stats.entries.to_string()]);
        table.add_row(vec![
            "Memory Used",
            &format!("{} bytes", stats.memory_bytes),
        ]);
        table.add_row(vec!["Total Requests", &stats.total_requests().to_string()]);
        table.add_row(vec!["Hits", &stats.hits.to_string()]);
        table.add_row(vec!["Misses", &stats.misses.to_string()]);
        table.add_row(vec![
            "Hit Rate",
            &format!("{:.1}%", stats.hit_rate() * 100.0),
        ]);
        table.add_row(vec!["Evictions", &stats.evictions.to_string()]);
        table.add_row(vec!["Expirations", &stats.expirations.to_string()]);
        table.add_row(vec![
            "Cleanup Worker",
            &cache
                .cleanup_status()
                .map(|status| format!("{:?}", status))
                .unwrap_or_else(|| "Not running".to_string()),
        ]);

        println!("{}", table);
    }

    fn get_history_file() -> Result<PathBuf> {
        let home = home::home_dir().context("Could not find home directory")?;
        let history_dir = home.join(".nrql_guard");
        std::fs::create_dir_all(&history_dir)?;
        Ok(history_dir.join("history.txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> QuerySession {
        QuerySession::new(&Settings::default())
    }

    #[test]
    fn test_miss_then_hit() {
        let session = session();
        let query = "SELECT count(*) FROM Transaction, PageView SINCE 1 hour ago";

        let first = session.run(query).unwrap();
        let stored = match first {
            QueryOutcome::Stored(value) => value,
            QueryOutcome::Cached(_) => panic!("first lookup should miss"),
        };
        assert_eq!(stored["event_types"], json!(["Transaction", "PageView"]));

        // Whitespace differences map to the same key
        let second = session
            .run("SELECT  count(*)\nFROM Transaction, PageView SINCE 1 hour ago")
            .unwrap();
        match second {
            QueryOutcome::Cached(value) => assert_eq!(value, stored),
            QueryOutcome::Stored(_) => panic!("second lookup should hit"),
        }

        let stats = session.cache().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_rejected_query_is_not_cached() {
        let session = session();
        let err = session.run("DROP TABLE users").err().unwrap();

        assert!(err.to_string().contains("DANGEROUS_OPERATION"));
        assert!(session.cache().is_empty());
    }

    #[test]
    fn test_forget() {
        let session = session();
        let query = "SELECT * FROM Transaction";
        session.run(query).unwrap();

        assert!(session.forget(query).unwrap());
        assert!(!session.forget(query).unwrap());
        assert!(session.cache().is_empty());
    }
}
