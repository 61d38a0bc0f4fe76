//! Phone number type for SMS contact.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The number has too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    BadLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
    /// The input contains a character that is not a digit, separator, or
    /// leading plus.
    #[error("phone number contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A phone number usable as an SMS destination.
///
/// Stored in a normalized form: an optional leading `+` followed by digits
/// only. Separators (spaces, dashes, parentheses) are accepted on input and
/// stripped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits (ITU-T E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, has a digit count outside
    /// 7-15, or contains characters other than digits, separators, and a
    /// leading `+`.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let mut normalized = String::with_capacity(trimmed.len());
        for (i, c) in trimmed.chars().enumerate() {
            match c {
                '0'..='9' => normalized.push(c),
                '+' if i == 0 => normalized.push(c),
                ' ' | '-' | '(' | ')' | '.' => {}
                other => return Err(PhoneError::InvalidCharacter(other)),
            }
        }

        let digits = normalized.chars().filter(char::is_ascii_digit).count();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits) {
            return Err(PhoneError::BadLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized number as a string slice.
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
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes() {
        let phone = Phone::parse("+86 138-0013-8000").expect("valid phone");
        assert_eq!(phone.as_str(), "+8613800138000");
    }

    #[test]
    fn rejects_empty_and_short() {
        assert!(matches!(Phone::parse(""), Err(PhoneError::Empty)));
        assert!(matches!(
            Phone::parse("12345"),
            Err(PhoneError::BadLength { .. })
        ));
    }

    #[test]
    fn rejects_letters_and_misplaced_plus() {
        assert!(matches!(
            Phone::parse("555-CALL-NOW"),
            Err(PhoneError::InvalidCharacter(_))
        ));
        assert!(matches!(
            Phone::parse("123+4567890"),
            Err(PhoneError::InvalidCharacter('+'))
        ));
    }
}
