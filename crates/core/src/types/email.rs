//! Customer email address.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `local@domain.tld`, no whitespace, exactly one `@`.
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

/// Longest address the backend stores.
const MAX_LENGTH: usize = 254;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most 254 characters")]
    TooLong,
    #[error("email must look like name@domain.tld")]
    InvalidFormat,
}

/// A checked order contact address.
///
/// ```
/// use larder_core::Email;
///
/// assert!(Email::parse(" anna@example.com ").is_ok());
/// assert!(Email::parse("anna@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Parse an address, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Empty`] for blank input, [`EmailError::TooLong`]
    /// past 254 bytes and [`EmailError::InvalidFormat`] otherwise.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > MAX_LENGTH {
            return Err(EmailError::TooLong);
        }
        if !EMAIL_PATTERN.is_match(s) {
            return Err(EmailError::InvalidFormat);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_order_contacts() {
        for raw in ["anna@example.com", "anna.petrova+larder@mail.co.uk", "a@b.c"] {
            assert_eq!(Email::parse(raw).unwrap().as_str(), raw);
        }
        assert_eq!(
            Email::parse("  anna@example.com\n").unwrap().as_str(),
            "anna@example.com"
        );
    }

    #[test]
    fn test_blank_is_empty() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse(" \t"), Err(EmailError::Empty));
    }

    #[test]
    fn test_length_limit() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(Email::parse(&long), Err(EmailError::TooLong));
    }

    #[test]
    fn test_rejects_malformed() {
        for raw in [
            "no-at-symbol",
            "@example.com",
            "anna@",
            "anna@localhost",
            "an na@example.com",
            "a@b@example.com",
            "anna@example.",
        ] {
            assert_eq!(Email::parse(raw), Err(EmailError::InvalidFormat), "{raw}");
        }
    }

    #[test]
    fn test_serializes_as_string() {
        let email = Email::parse("anna@example.com").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"anna@example.com\"");
    }
}
