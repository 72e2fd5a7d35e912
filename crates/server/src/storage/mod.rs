//! Object storage for profile photos.
//!
//! # Backends
//!
//! - [`HttpObjectStore`] - Supabase-compatible storage HTTP API
//! - [`LocalObjectStore`] - files on local disk, served under `/media`
//! - [`MemoryObjectStore`] - process memory, used by tests
//!
//! Every store is bound to a single bucket; keys are flat file names such as
//! `{account_id}.jpg`.

pub mod http;
pub mod local;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

/// Errors that can occur when talking to an object store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage API returned a non-success status.
    #[error("storage API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object exists and the write did not allow overwriting.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// Key is empty or contains path separators.
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),

    /// Could not build a URL for the object.
    #[error("invalid object URL: {0}")]
    Url(String),
}

/// Options for [`ObjectStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    /// Overwrite an existing object at the same key.
    pub upsert: bool,
    /// `Cache-Control` value stored with the object.
    pub cache_control: Option<String>,
    /// MIME type of the body.
    pub content_type: String,
}

impl PutOptions {
    /// Overwrite-in-place with caching disabled.
    #[must_use]
    pub fn replace_uncached(content_type: &str) -> Self {
        Self {
            upsert: true,
            cache_control: Some("max-age=0".to_string()),
            content_type: content_type.to_string(),
        }
    }
}

/// A bucket of binary objects with public URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the object could not be written.
    async fn put(&self, key: &str, body: Bytes, options: &PutOptions) -> Result<(), StorageError>;

    /// Public URL at which `key` is served.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` if the key is not a flat object name.
    fn public_url(&self, key: &str) -> Result<Url, StorageError>;
}

/// Reject keys that could escape the bucket.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\'])
        || key.chars().any(char::is_control)
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Append path segments to a base URL, keeping any path the base already has.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, StorageError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| StorageError::Url(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
