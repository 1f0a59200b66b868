//! Compiled patterns shared by the validator.

use once_cell::sync::Lazy;
use regex::Regex;

/// Statements that modify data or permissions. Matched as whole words.
pub static DANGEROUS_OPERATIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(DROP|DELETE|UPDATE|INSERT|CREATE|ALTER|EXEC|EXECUTE|GRANT|REVOKE|TRUNCATE)\b",
    )
    .expect("invalid dangerous operations regex")
});

/// Comment markers, statement separators, UNION and tautologies.
pub static INJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(--|/\*|\*/|;|\bunion\b",
        r"|\b(?:or|and)\s*\(?\s*[0-9]+\s*=\s*[0-9]+",
        r#"|'\s*=\s*'|"\s*=\s*"|'or'|"or")"#,
    ))
    .expect("invalid injection regex")
});

pub static SELECT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^SELECT\b").expect("invalid select regex"));

/// A FROM keyword followed by something to select from.
pub static FROM_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bFROM\b\s*\S").expect("invalid from regex"));

pub static FROM_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bFROM\b").expect("invalid from keyword regex"));

pub static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

pub static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.\-]+$").expect("invalid identifier regex"));

/// Clause keywords that end the event type list of a FROM clause.
pub const CLAUSE_KEYWORDS: &[&str] = &[
    "WHERE",
    "SINCE",
    "UNTIL",
    "FACET",
    "LIMIT",
    "TIMESERIES",
    "COMPARE",
    "WITH",
    "ORDER",
    "OFFSET",
    "EXTRAPOLATE",
];

pub fn is_clause_keyword(word: &str) -> bool {
    CLAUSE_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(word))
}
