//! Shared building blocks for nrql-guard.
//!
//! `error` holds the validation taxonomy every rejection is reported with, and
//! `settings` holds the externally supplied configuration that is turned into
//! plain validator and cache configuration values at startup.

pub mod error;
pub mod settings;

pub use error::{ConfigError, Result, ValidationError};
pub use settings::{CacheSettings, Settings, ValidatorSettings};
