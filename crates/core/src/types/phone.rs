//! Phone number type.
//!
//! The store only delivers domestically, so numbers follow the `+7` plan:
//! an optional `+7`/`7`/`8` trunk prefix, a three-digit area code starting
//! with 4, 8 or 9, then seven subscriber digits. Dashes, spaces and
//! parentheses are tolerated as separators.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+7|7|8)?-?\(?[489][0-9]{2}\)?-?[0-9]{3}-?[0-9]{2}-?[0-9]{2}$")
        .expect("Invalid regex")
});

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input does not match the domestic numbering plan.
    #[error("phone number must look like +7 (9XX) XXX-XX-XX")]
    InvalidFormat,
}

/// A validated phone number, stored normalized as `+7XXXXXXXXXX`.
///
/// ```
/// use larder_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("8 (912) 345-67-89").unwrap();
/// assert_eq!(phone.as_str(), "+79123456789");
///
/// assert!(PhoneNumber::parse("12345").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse and normalize a phone number. Whitespace anywhere is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] for blank input and
    /// [`PhoneError::InvalidFormat`] when the digits do not fit the plan.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        if compact.is_empty() {
            return Err(PhoneError::Empty);
        }

        if !PHONE_PATTERN.is_match(&compact) {
            return Err(PhoneError::InvalidFormat);
        }

        let digits: String = compact.chars().filter(char::is_ascii_digit).collect();
        // The pattern guarantees 10 national digits, optionally behind a 7/8 trunk digit.
        let national = digits
            .get(digits.len().saturating_sub(10)..)
            .ok_or(PhoneError::InvalidFormat)?;

        Ok(Self(format!("+7{national}")))
    }

    /// Returns the normalized number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
