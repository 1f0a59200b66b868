//! NRQL query validation and sanitization

use crate::patterns::{
    is_clause_keyword, DANGEROUS_OPERATIONS, FROM_CLAUSE, FROM_KEYWORD, IDENTIFIER, INJECTION,
    SELECT_PREFIX, WHITESPACE,
};
use crate::scanner::Scanner;
use crate::time_range::{self, TimeRangeKind};
use nrql_core::{Result, ValidationError, ValidatorSettings};
use tracing::debug;

/// Limits applied by [`NrqlValidator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Maximum query length in characters, after trimming
    pub max_query_length: usize,
    /// Maximum identifier length in characters
    pub max_identifier_length: usize,
    /// Length string values are truncated to
    pub max_string_value_length: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_query_length: 10_000,
            max_identifier_length: 255,
            max_string_value_length: 4_000,
        }
    }
}

impl From<&ValidatorSettings> for ValidatorConfig {
    fn from(settings: &ValidatorSettings) -> Self {
        Self {
            max_query_length: settings.max_query_length,
            max_identifier_length: settings.max_identifier_length,
            max_string_value_length: settings.max_string_value_length,
        }
    }
}

impl ValidatorConfig {
    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }
}

/// Gate for untrusted query text and identifiers.
///
/// All checks are pure; one validator can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct NrqlValidator {
    config: ValidatorConfig,
}

impl NrqlValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Normalize and validate a query.
    ///
    /// Returns the whitespace-normalized query, or the first reason it was
    /// rejected. Sanitizing an already sanitized query returns it unchanged.
    pub fn sanitize(&self, query: &str) -> Result<String> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }

        let length = trimmed.chars().count();
        if length > self.config.max_query_length {
            return Err(ValidationError::TooLong {
                max: self.config.max_query_length,
                actual: length,
            });
        }

        let query = normalize_whitespace(&trimmed.replace('\0', ""));
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }

        if let Some(caps) = DANGEROUS_OPERATIONS.captures(&query) {
            let keyword = caps[1].to_uppercase();
            debug!("Rejected query with dangerous operation {}", keyword);
            return Err(ValidationError::DangerousOperation { keyword });
        }

        if let Some(found) = INJECTION.find(&query) {
            debug!("Rejected query with injection pattern {:?}", found.as_str());
            return Err(ValidationError::InjectionPattern {
                pattern: found.as_str().to_string(),
            });
        }

        check_syntax(&query)?;

        Ok(query)
    }

    /// Validate an event type or attribute name.
    pub fn sanitize_identifier(&self, identifier: &str) -> Result<String> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ValidationError::invalid_identifier(
                identifier,
                "identifier cannot be empty",
            ));
        }

        if identifier.chars().count() > self.config.max_identifier_length {
            return Err(ValidationError::invalid_identifier(
                identifier,
                format!(
                    "exceeds maximum length of {} characters",
                    self.config.max_identifier_length
                ),
            ));
        }

        if !IDENTIFIER.is_match(identifier) {
            return Err(ValidationError::invalid_identifier(
                identifier,
                "only letters, digits, '_', '.' and '-' are allowed",
            ));
        }

        Ok(identifier.to_string())
    }

    /// Make a string safe to embed in a single-quoted literal.
    ///
    /// Single quotes are doubled, control characters other than tab and
    /// newline are dropped, and the result is cut to the configured length.
    /// The cut never separates a doubled quote.
    pub fn sanitize_string_value(&self, value: &str) -> String {
        let max = self.config.max_string_value_length;
        let mut out = String::with_capacity(value.len().min(max));
        let mut length = 0usize;

        for ch in value.chars() {
            if ch.is_control() && ch != '\t' && ch != '\n' {
                continue;
            }

            let width = if ch == '\'' { 2 } else { 1 };
            if length + width > max {
                break;
            }

            out.push(ch);
            if ch == '\'' {
                out.push('\'');
            }
            length += width;
        }

        out
    }

    /// Accept only the recognized relative and absolute time range shapes.
    pub fn validate_time_range(&self, time_range: &str) -> Result<TimeRangeKind> {
        time_range::classify(time_range)
            .ok_or_else(|| ValidationError::InvalidTimeRange(time_range.trim().to_string()))
    }

    /// Event types named in the FROM clause of a query.
    pub fn extract_event_types(&self, query: &str) -> Result<Vec<String>> {
        let query = self.sanitize(query)?;
        let masked = Scanner::mask_literals(&query);

        let from = FROM_KEYWORD
            .find(&masked)
            .ok_or(ValidationError::MissingSelectOrFrom {
                requirement: "have a FROM clause",
            })?;

        let list = masked[from.end()..]
            .split_whitespace()
            .take_while(|word| !is_clause_keyword(word))
            .collect::<Vec<_>>()
            .join(" ");

        let mut event_types = Vec::new();
        for item in list.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let event_type = self.sanitize_identifier(item).map_err(|err| match err {
                ValidationError::InvalidIdentifier { reason, .. } => {
                    ValidationError::invalid_identifier(
                        item,
                        format!("invalid event type: {}", reason),
                    )
                }
                other => other,
            })?;
            event_types.push(event_type);
        }

        if event_types.is_empty() {
            return Err(ValidationError::invalid_identifier(
                &list,
                "no valid event types found",
            ));
        }

        Ok(event_types)
    }
}

fn normalize_whitespace(query: &str) -> String {
    WHITESPACE.replace_all(query, " ").trim().to_string()
}

fn check_syntax(query: &str) -> Result<()> {
    let upper = query.to_uppercase();

    if !SELECT_PREFIX.is_match(&upper) {
        return Err(ValidationError::MissingSelectOrFrom {
            requirement: "start with SELECT",
        });
    }

    // A FROM inside a string literal is not a clause
    if !FROM_CLAUSE.is_match(&Scanner::mask_literals(&upper)) {
        return Err(ValidationError::MissingSelectOrFrom {
            requirement: "have a FROM clause",
        });
    }

    Scanner::new(query).check_structure()
}
