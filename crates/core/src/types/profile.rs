//! Profile field types.

use core::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Errors that can occur when parsing an [`Age`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AgeError {
    /// The input is not a whole number.
    #[error("age must be a whole number")]
    NotANumber,
    /// The input is a negative number.
    #[error("age cannot be negative")]
    Negative,
}

/// A non-negative age in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Age(i32);

impl Age {
    /// Parse an optional age from a form field.
    ///
    /// Blank input means "no value" and yields `Ok(None)`, never zero.
    ///
    /// # Errors
    ///
    /// Returns [`AgeError`] if the input is not a whole number or is negative.
    pub fn parse_optional(input: &str) -> Result<Option<Self>, AgeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let value: i64 = trimmed.parse().map_err(|_| AgeError::NotANumber)?;
        Self::try_from(value).map(Some)
    }

    /// Get the age in years.
    #[must_use]
    pub const fn years(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i64> for Age {
    type Error = AgeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(AgeError::Negative);
        }
        i32::try_from(value)
            .map(Self)
            .map_err(|_| AgeError::NotANumber)
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Social platforms a profile can link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialPlatform {
    Instagram,
    Tiktok,
    Twitter,
}

impl SocialPlatform {
    /// All supported platforms, in display order.
    pub const ALL: [Self; 3] = [Self::Instagram, Self::Tiktok, Self::Twitter];

    /// Public profile URL for a handle on this platform.
    ///
    /// The handle is a single percent-encoded path segment, so it cannot add
    /// a query or fragment to the link.
    #[must_use]
    pub fn profile_url(self, handle: &SocialHandle) -> Option<Url> {
        let (origin, prefix) = match self {
            Self::Instagram => ("https://instagram.com", ""),
            Self::Tiktok => ("https://tiktok.com", "@"),
            Self::Twitter => ("https://twitter.com", ""),
        };
        let mut url = Url::parse(origin).ok()?;
        url.path_segments_mut()
            .ok()?
            .clear()
            .push(&format!("{prefix}{handle}"));
        Some(url)
    }
}

impl fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instagram => write!(f, "instagram"),
            Self::Tiktok => write!(f, "tiktok"),
            Self::Twitter => write!(f, "twitter"),
        }
    }
}

/// A social media handle.
///
/// No format validation beyond being non-empty; surrounding whitespace and a
/// single leading `@` are stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocialHandle(String);

impl SocialHandle {
    /// Parse an optional handle from a form field. Blank input yields `None`.
    #[must_use]
    pub fn parse_optional(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let handle = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();
        if handle.is_empty() {
            None
        } else {
            Some(Self(handle.to_owned()))
        }
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SocialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
