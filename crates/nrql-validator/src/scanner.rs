//! Quote-aware structural scan of query text.
//!
//! Parentheses are only counted outside string literals. A literal opens
//! with `'` or `"` and closes with the same character; inside a literal a
//! backslash escapes whatever follows it.

use nrql_core::{Result, ValidationError};

pub struct Scanner {
    input: Vec<char>,
    position: usize,
}

impl Scanner {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Walk the whole input and check parentheses and literals.
    ///
    /// Positions in errors are character offsets into the input.
    pub fn check_structure(&mut self) -> Result<()> {
        let mut open_parens: Vec<usize> = Vec::new();

        while self.position < self.input.len() {
            match self.current_char() {
                '\'' | '"' => self.skip_string()?,
                '(' => {
                    open_parens.push(self.position);
                    self.advance();
                }
                ')' => {
                    if open_parens.pop().is_none() {
                        return Err(ValidationError::UnbalancedParentheses {
                            position: self.position,
                        });
                    }
                    self.advance();
                }
                _ => self.advance(),
            }
        }

        match open_parens.first() {
            Some(&position) => Err(ValidationError::UnbalancedParentheses { position }),
            None => Ok(()),
        }
    }

    /// Copy of the input with every string literal, quotes included,
    /// replaced by spaces. Character positions are preserved.
    ///
    /// Expects input that already passed [`Scanner::check_structure`];
    /// an unterminated literal is blanked to the end.
    pub fn mask_literals(input: &str) -> String {
        let mut scanner = Scanner::new(input);
        let mut masked = String::with_capacity(input.len());

        while scanner.position < scanner.input.len() {
            let ch = scanner.current_char();
            if ch == '\'' || ch == '"' {
                let start = scanner.position;
                // Unterminated literals still mask to the end of input.
                let _ = scanner.skip_string();
                masked.extend(std::iter::repeat(' ').take(scanner.position - start));
            } else {
                masked.push(ch);
                scanner.advance();
            }
        }

        masked
    }

    fn skip_string(&mut self) -> Result<()> {
        let quote = self.current_char();
        self.advance();

        while self.position < self.input.len() {
            let ch = self.current_char();
            if ch == '\\' {
                // Skip the backslash and the escaped character
                self.advance();
                self.advance();
            } else if ch == quote {
                self.advance();
                return Ok(());
            } else {
                self.advance();
            }
        }

        // An escape on the final character can step past the end
        self.position = self.input.len();
        Err(ValidationError::UnclosedStringLiteral { quote })
    }

    fn current_char(&self) -> char {
        if self.position < self.input.len() {
            self.input[self.position]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        self.position += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(input: &str) -> Result<()> {
        Scanner::new(input).check_structure()
    }

    #[test]
    fn test_balanced() {
        assert!(check("SELECT count(*) FROM Transaction").is_ok());
        assert!(check("SELECT percentile(duration, 95) FROM Transaction").is_ok());
        assert!(check("SELECT filter(count(*), WHERE (a = 1)) FROM T").is_ok());
    }

    #[test]
    fn test_parens_inside_literals_are_ignored() {
        assert!(check("SELECT * FROM T WHERE name = ')('").is_ok());
        assert!(check(r#"SELECT * FROM T WHERE name = "(((""#).is_ok());
        assert!(check("SELECT count(*) FROM T WHERE a = 'x)' AND b = '(y'").is_ok());
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(
            check("SELECT count(* FROM T"),
            Err(ValidationError::UnbalancedParentheses { position: 12 })
        );
        assert_eq!(
            check("SELECT count*) FROM T"),
            Err(ValidationError::UnbalancedParentheses { position: 13 })
        );
    }

    #[test]
    fn test_unclosed_literal() {
        assert_eq!(
            check("SELECT * FROM T WHERE name = 'abc"),
            Err(ValidationError::UnclosedStringLiteral { quote: '\'' })
        );
        assert_eq!(
            check(r#"SELECT * FROM T WHERE name = "abc"#),
            Err(ValidationError::UnclosedStringLiteral { quote: '"' })
        );
    }

    #[test]
    fn test_backslash_escapes_quote() {
        assert!(check(r"SELECT * FROM T WHERE name = 'it\'s'").is_ok());
        assert_eq!(
            check(r"SELECT * FROM T WHERE name = 'abc\'"),
            Err(ValidationError::UnclosedStringLiteral { quote: '\'' })
        );
        // Escaped backslash does not escape the closing quote
        assert!(check(r"SELECT * FROM T WHERE path = 'C:\\'").is_ok());
        // Trailing backslash at end of input
        assert!(check(r"SELECT * FROM T WHERE a = '\").is_err());
    }

    #[test]
    fn test_other_quote_kind_inside_literal() {
        assert!(check(r#"SELECT * FROM T WHERE a = "it's""#).is_ok());
        assert!(check(r#"SELECT * FROM T WHERE a = 'say "hi"'"#).is_ok());
    }

    #[test]
    fn test_doubled_quotes() {
        assert!(check("SELECT * FROM T WHERE a = 'it''s'").is_ok());
    }

    #[test]
    fn test_mask_literals() {
        let masked = Scanner::mask_literals("SELECT 'from' FROM T");
        assert_eq!(masked, "SELECT        FROM T");
        assert_eq!(
            masked.chars().count(),
            "SELECT 'from' FROM T".chars().count()
        );
    }
}
