//! QR tag codes.
//!
//! A [`Code`] is the short opaque token printed on a bracelet's QR tag. Codes
//! are either carried in from a scan or generated at registration time; they
//! are never deduplicated at generation time, uniqueness is enforced when the
//! code is bound to a profile.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Alphabet used for generated codes (`[0-9a-z]`).
const GENERATED_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Errors that can occur when parsing a [`Code`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The input is empty after trimming.
    #[error("code cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9_-]`.
    #[error("code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A QR tag code.
///
/// ## Constraints
///
/// - 1-64 characters after trimming surrounding whitespace
/// - Only ASCII letters, digits, `_` and `-`
/// - Case-sensitive
///
/// ## Examples
///
/// ```
/// use qrtag_core::Code;
///
/// let code = Code::parse(" ab12cd34 ").unwrap();
/// assert_eq!(code.as_str(), "ab12cd34");
///
/// assert!(Code::parse("").is_err());
/// assert!(Code::parse("ab/12").is_err());
///
/// let fresh = Code::generate();
/// assert_eq!(fresh.as_str().len(), Code::GENERATED_LENGTH);
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Maximum length of a code.
    pub const MAX_LENGTH: usize = 64;

    /// Length of codes produced by [`Code::generate`].
    pub const GENERATED_LENGTH: usize = 8;

    /// Parse a `Code` from user input.
    ///
    /// # Errors
    ///
    /// Returns a [`CodeError`] if the input is empty, too long, or contains a
    /// character outside the allowed set.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CodeError::Empty);
        }

        if trimmed.len() > Self::MAX_LENGTH {
            return Err(CodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(CodeError::InvalidCharacter(bad));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Generate a fresh random code of [`Code::GENERATED_LENGTH`] characters
    /// drawn from `[0-9a-z]`.
    ///
    /// The result is not checked against existing codes.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..Self::GENERATED_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..GENERATED_ALPHABET.len());
                char::from(GENERATED_ALPHABET.get(idx).copied().unwrap_or(b'0'))
            })
            .collect();
        Self(code)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Code` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Code {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        assert_eq!(Code::parse("  ab12cd34\n").unwrap().as_str(), "ab12cd34");
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_ne!(Code::parse("AB12").unwrap(), Code::parse("ab12").unwrap());
    }

    #[test]
    fn test_parse_accepts_dash_and_underscore() {
        assert!(Code::parse("tag_2024-001").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Code::parse(" "), Err(CodeError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(Code::MAX_LENGTH + 1);
        assert!(matches!(Code::parse(&long), Err(CodeError::TooLong { .. })));
        assert!(Code::parse(&"a".repeat(Code::MAX_LENGTH)).is_ok());
    }

    #[test]
    fn test_parse_rejects_path_characters() {
        assert_eq!(
            Code::parse("../etc"),
            Err(CodeError::InvalidCharacter('.'))
        );
        assert_eq!(Code::parse("a?b"), Err(CodeError::InvalidCharacter('?')));
    }

    #[test]
    fn test_generate_shape() {
        for _ in 0..100 {
            let code = Code::generate();
            assert_eq!(code.as_str().len(), Code::GENERATED_LENGTH);
            assert!(
                code.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
            );
            // Generated codes always satisfy the parser
            assert_eq!(Code::parse(code.as_str()).unwrap(), code);
        }
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Code>("\"ok-code\"").is_ok());
        assert!(serde_json::from_str::<Code>("\"\"").is_err());
        assert!(serde_json::from_str::<Code>("\"bad code\"").is_err());
    }
}
