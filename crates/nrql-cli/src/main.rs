use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use nrql_core::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod repl;

use commands::*;
use repl::Repl;

#[derive(Parser)]
#[command(name = "nrql-guard")]
#[command(author, version, about = "NRQL Guard - Query validation and result caching", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive REPL backed by a live cache
    Repl,

    /// Sanitize and syntax-check a query
    Sanitize {
        /// NRQL query text
        query: String,

        /// Also print the cache key for the sanitized query
        #[arg(short, long)]
        key: bool,
    },

    /// Validate an identifier such as an event type or attribute name
    Identifier {
        /// Identifier to check
        name: String,
    },

    /// Escape a value for use inside a single-quoted literal
    Escape {
        /// Raw value
        value: String,
    },

    /// Classify a SINCE/UNTIL time range expression
    TimeRange {
        /// Time range, e.g. "1 hour ago"
        range: String,
    },

    /// List the event types named in a query's FROM clause
    EventTypes {
        /// NRQL query text
        query: String,
    },

    /// Print the effective settings as JSON
    Settings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let settings = settings
        .apply_env()
        .context("Invalid environment override")?;

    match cli.command {
        Some(Commands::Repl) | None => {
            print_banner();
            let mut repl = Repl::new(&settings)?;
            repl.run()?;
        }
        Some(Commands::Sanitize { query, key }) => {
            sanitize_query(&settings, &query, key)?;
        }
        Some(Commands::Identifier { name }) => {
            check_identifier(&settings, &name)?;
        }
        Some(Commands::Escape { value }) => {
            escape_value(&settings, &value);
        }
        Some(Commands::TimeRange { range }) => {
            check_time_range(&settings, &range)?;
        }
        Some(Commands::EventTypes { query }) => {
            list_event_types(&settings, &query)?;
        }
        Some(Commands::Settings) => {
            show_settings(&settings)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        "nrql_cli=debug,nrql_core=debug,nrql_validator=debug,nrql_cache=debug"
    } else {
        "nrql_cli=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
  _ __  _ __ __ _| |   __ _ _   _  __ _ _ __ __| |
 | '_ \| '__/ _` | |  / _` | | | |/ _` | '__/ _` |
 | | | | | | (_| | | | (_| | |_| | (_| | | | (_| |
 |_| |_|_|  \__, |_|  \__, |\__,_|\__,_|_|  \__,_|
               |_|    |___/
    "#
        .bright_cyan()
    );
    println!(
        "{}",
        "NRQL Guard v0.1.0 - validated queries, cached results".bright_yellow()
    );
    println!("{}", "Type '.help' for available commands\n".bright_black());
}
