//! SQL identifier guard.
//!
//! Table and column names are interpolated into SQL text, so every one of
//! them must pass `is_identifier` before it reaches a statement.

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

/// Double-quotes an identifier that already passed `is_identifier`.
pub(crate) fn quote(value: &str) -> String {
    format!("\"{value}\"")
}

#[cfg(test)]
mod tests {
    use super::{is_identifier, quote};

    #[test]
    fn accepts_plain_names() {
        assert!(is_identifier("users"));
        assert!(is_identifier("_created_at2"));
    }

    #[test]
    fn rejects_expressions_and_quotes() {
        assert!(!is_identifier(""));
        assert!(!is_identifier("1users"));
        assert!(!is_identifier("users; DROP TABLE users"));
        assert!(!is_identifier("email\""));
        assert!(!is_identifier("users.id"));
    }

    #[test]
    fn quotes_with_double_quotes() {
        assert_eq!(quote("users"), "\"users\"");
    }
}
