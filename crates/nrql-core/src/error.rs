use thiserror::Error;

/// Reasons a query, identifier or time range is rejected.
///
/// Rejections are final: the same input will be rejected again, so callers
/// surface the error to the end user instead of retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("query cannot be empty")]
    EmptyQuery,

    #[error("query exceeds maximum length of {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("query contains potentially dangerous operation: {keyword}")]
    DangerousOperation { keyword: String },

    #[error("query contains potential injection pattern: {pattern}")]
    InjectionPattern { pattern: String },

    #[error("query must {requirement}")]
    MissingSelectOrFrom { requirement: &'static str },

    #[error("unbalanced parentheses in query at position {position}")]
    UnbalancedParentheses { position: usize },

    #[error("unclosed string literal in query (opened with {quote})")]
    UnclosedStringLiteral { quote: char },

    #[error("invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    #[error("invalid time range format: '{0}'")]
    InvalidTimeRange(String),
}

impl ValidationError {
    /// Stable machine-readable code for the rejection reason.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyQuery => "EMPTY_QUERY",
            ValidationError::TooLong { .. } => "QUERY_TOO_LONG",
            ValidationError::DangerousOperation { .. } => "DANGEROUS_OPERATION",
            ValidationError::InjectionPattern { .. } => "INJECTION_PATTERN",
            ValidationError::MissingSelectOrFrom { .. } => "MISSING_SELECT_OR_FROM",
            ValidationError::UnbalancedParentheses { .. } => "UNBALANCED_PARENTHESES",
            ValidationError::UnclosedStringLiteral { .. } => "UNCLOSED_STRING_LITERAL",
            ValidationError::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            ValidationError::InvalidTimeRange(_) => "INVALID_TIME_RANGE",
        }
    }

    /// Create an identifier rejection
    pub fn invalid_identifier(identifier: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = vec![
            ValidationError::EmptyQuery,
            ValidationError::TooLong { max: 1, actual: 2 },
            ValidationError::DangerousOperation {
                keyword: "DROP".into(),
            },
            ValidationError::InjectionPattern {
                pattern: ";".into(),
            },
            ValidationError::MissingSelectOrFrom {
                requirement: "start with SELECT",
            },
            ValidationError::UnbalancedParentheses { position: 0 },
            ValidationError::UnclosedStringLiteral { quote: '\'' },
            ValidationError::invalid_identifier("a b", "contains invalid characters"),
            ValidationError::InvalidTimeRange("now".into()),
        ];

        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_error_messages() {
        let err = ValidationError::TooLong {
            max: 10000,
            actual: 10001,
        };
        assert_eq!(
            err.to_string(),
            "query exceeds maximum length of 10000 characters (got 10001)"
        );

        let err = ValidationError::DangerousOperation {
            keyword: "DROP".into(),
        };
        assert!(err.to_string().contains("DROP"));
    }
}
