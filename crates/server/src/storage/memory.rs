//! In-memory object store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use url::Url;

use super::{ObjectStore, PutOptions, StorageError, validate_key};

/// An object as written by [`ObjectStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub options: PutOptions,
}

/// Base of the URLs handed out by [`MemoryObjectStore`].
const PUBLIC_BASE: &str = "memory://objects";

/// Object store held in process memory.
///
/// Uploads can be made to fail on demand to exercise error paths.
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
    fail_puts: AtomicBool,
    puts: AtomicUsize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    /// Create an empty store with public URLs under `memory://objects/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            fail_puts: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    /// Make subsequent `put` calls fail (or succeed again).
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Object stored at `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no objects are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of successful `put` calls.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, body: Bytes, options: &PutOptions) -> Result<(), StorageError> {
        validate_key(key)?;
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Status {
                status: 503,
                message: "injected failure".to_string(),
            });
        }
        if !options.upsert && self.objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }

        self.objects.insert(
            key.to_string(),
            StoredObject {
                body,
                options: options.clone(),
            },
        );
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn public_url(&self, key: &str) -> Result<Url, StorageError> {
        validate_key(key)?;
        Url::parse(&format!("{PUBLIC_BASE}/{key}")).map_err(|e| StorageError::Url(e.to_string()))
    }
}
