//! Egyptian mobile phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input is not an 11-digit number with a known mobile prefix.
    #[error("phone number must be 11 digits starting with 010, 011, 012 or 015")]
    InvalidFormat,
}

/// An Egyptian mobile phone number.
///
/// ## Constraints
///
/// - Exactly 11 ASCII digits
/// - Starts with one of the carrier prefixes `010`, `011`, `012`, `015`
///
/// Surrounding whitespace is trimmed before validation.
///
/// ## Examples
///
/// ```
/// use vix_core::Phone;
///
/// assert!(Phone::parse("01012345678").is_ok());
/// assert!(Phone::parse("01534567890").is_ok());
///
/// assert!(Phone::parse("0101234567").is_err());  // too short
/// assert!(Phone::parse("02012345678").is_err()); // landline prefix
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Number of digits in a mobile number.
    pub const LENGTH: usize = 11;

    /// Accepted carrier prefixes.
    pub const PREFIXES: [&'static str; 4] = ["010", "011", "012", "015"];

    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] for blank input and
    /// [`PhoneError::InvalidFormat`] for anything that is not an 11-digit
    /// number with an accepted prefix.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        if s.len() != Self::LENGTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneError::InvalidFormat);
        }

        if !Self::PREFIXES.iter().any(|prefix| s.starts_with(prefix)) {
            return Err(PhoneError::InvalidFormat);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_numbers() {
        assert!(Phone::parse("01012345678").is_ok());
        assert!(Phone::parse("01112345678").is_ok());
        assert!(Phone::parse("01212345678").is_ok());
        assert!(Phone::parse("01534567890").is_ok());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let phone = Phone::parse("  01012345678 ").unwrap();
        assert_eq!(phone.as_str(), "01012345678");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Phone::parse(""), Err(PhoneError::Empty));
        assert_eq!(Phone::parse("   "), Err(PhoneError::Empty));
    }

    #[test]
    fn test_parse_too_short() {
        assert_eq!(Phone::parse("0101234567"), Err(PhoneError::InvalidFormat));
    }

    #[test]
    fn test_parse_too_long() {
        assert_eq!(Phone::parse("010123456789"), Err(PhoneError::InvalidFormat));
    }

    #[test]
    fn test_parse_wrong_prefix() {
        assert_eq!(Phone::parse("02012345678"), Err(PhoneError::InvalidFormat));
        assert_eq!(Phone::parse("01312345678"), Err(PhoneError::InvalidFormat));
        assert_eq!(Phone::parse("01,12345678"), Err(PhoneError::InvalidFormat));
    }

    #[test]
    fn test_parse_non_digits() {
        assert_eq!(Phone::parse("0101234567a"), Err(PhoneError::InvalidFormat));
        assert_eq!(Phone::parse("+2010123456"), Err(PhoneError::InvalidFormat));
    }

    #[test]
    fn test_serde_roundtrip() {
        let phone = Phone::parse("01012345678").unwrap();
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"01012345678\"");
    }
}
