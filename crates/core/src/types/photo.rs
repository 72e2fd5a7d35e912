//! Profile photo references.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Name of the cache-busting query parameter.
const CACHE_BUST_PARAM: &str = "t";

/// Cache-busted public pointer to a profile's current photo object.
///
/// The photo object itself lives at a fixed per-account key and is
/// overwritten in place; the token appended here changes on every
/// replacement so clients bypass stale caches of the same URL.
///
/// ```
/// use qrtag_core::PhotoRef;
///
/// let photo = PhotoRef::new("https://cdn.example.com/profile_pics/a.jpg", 1_700_000_000_000);
/// assert_eq!(photo.as_str(), "https://cdn.example.com/profile_pics/a.jpg?t=1700000000000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(String);

impl PhotoRef {
    /// Build a reference from an object's public URL and a cache-busting token.
    #[must_use]
    pub fn new(public_url: &str, token: i64) -> Self {
        let separator = if public_url.contains('?') { '&' } else { '?' };
        Self(format!("{public_url}{separator}{CACHE_BUST_PARAM}={token}"))
    }

    /// Wrap a reference previously produced by [`PhotoRef::new`], e.g. when
    /// reading it back from storage.
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the full URL including the cache-busting token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the reference and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_to_existing_query() {
        let photo = PhotoRef::new("https://cdn.example.com/a.jpg?download=0", 5);
        assert_eq!(photo.as_str(), "https://cdn.example.com/a.jpg?download=0&t=5");
    }

    #[test]
    fn test_tokens_change_the_reference() {
        let url = "https://cdn.example.com/a.jpg";
        assert_ne!(PhotoRef::new(url, 1), PhotoRef::new(url, 2));
    }
}
