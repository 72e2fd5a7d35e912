//! Local filesystem object store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use super::{ObjectStore, PutOptions, StorageError, join_segments, validate_key};

/// URL path prefix under which the server exposes local objects.
pub const MEDIA_ROUTE: &str = "/media";

/// Object store writing to `{root}/{bucket}/{key}`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never sees a half-written photo.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
    public_base: Url,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`, serving objects from
    /// `{public_base}/media/{bucket}/{key}`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>, public_base: Url) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base,
        }
    }

    /// Root directory served under [`MEDIA_ROUTE`].
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(&self.bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, body: Bytes, options: &PutOptions) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.object_path(key);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        if !options.upsert && tokio::fs::try_exists(&path).await? {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }

        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), bytes = body.len(), "Wrote local object");
        Ok(())
    }

    fn public_url(&self, key: &str) -> Result<Url, StorageError> {
        validate_key(key)?;
        join_segments(
            &self.public_base,
            &[MEDIA_ROUTE.trim_start_matches('/'), &self.bucket, key],
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> LocalObjectStore {
        LocalObjectStore::new(
            dir,
            "profile_pics",
            Url::parse("http://localhost:3000").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_put_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let options = PutOptions::replace_uncached("image/jpeg");

        store
            .put("a.jpg", Bytes::from_static(b"first"), &options)
            .await
            .unwrap();
        store
            .put("a.jpg", Bytes::from_static(b"second"), &options)
            .await
            .unwrap();

        let stored = std::fs::read(dir.path().join("profile_pics").join("a.jpg")).unwrap();
        assert_eq!(stored, b"second");

        let entries = std::fs::read_dir(dir.path().join("profile_pics"))
            .unwrap()
            .count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_put_without_upsert_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let options = PutOptions {
            upsert: false,
            cache_control: None,
            content_type: "image/jpeg".to_string(),
        };

        store
            .put("a.jpg", Bytes::from_static(b"first"), &options)
            .await
            .unwrap();
        let err = store
            .put("a.jpg", Bytes::from_static(b"second"), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn test_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let url = store(dir.path()).public_url("a.jpg").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/media/profile_pics/a.jpg");
    }
}
