//! Supabase-compatible storage API client.
//!
//! Uploads go to `POST {base}/storage/v1/object/{bucket}/{key}` with the
//! `x-upsert` and `cache-control` headers; objects are read back from
//! `{base}/storage/v1/object/public/{bucket}/{key}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ObjectStore, PutOptions, StorageError, join_segments, validate_key};

/// Object store backed by a storage HTTP API.
#[derive(Clone)]
pub struct HttpObjectStore {
    inner: Arc<HttpObjectStoreInner>,
}

struct HttpObjectStoreInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    bucket: String,
}

impl HttpObjectStore {
    /// Create a client for one bucket.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Http` if the HTTP client cannot be built.
    pub fn new(
        base_url: Url,
        api_key: SecretString,
        bucket: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: Arc::new(HttpObjectStoreInner {
                client,
                base_url,
                api_key,
                bucket: bucket.into(),
            }),
        })
    }

    fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        join_segments(
            &self.inner.base_url,
            &["storage", "v1", "object", &self.inner.bucket, key],
        )
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, body: Bytes, options: &PutOptions) -> Result<(), StorageError> {
        validate_key(key)?;
        let url = self.object_url(key)?;
        let api_key = self.inner.api_key.expose_secret();

        let mut request = self
            .inner
            .client
            .post(url)
            .bearer_auth(api_key)
            .header("apikey", api_key)
            .header("Content-Type", &options.content_type)
            .header("x-upsert", if options.upsert { "true" } else { "false" });
        if let Some(cache_control) = &options.cache_control {
            request = request.header("cache-control", cache_control);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let response_text = response.text().await.unwrap_or_default();
        tracing::error!(
            status = %status,
            key,
            body = %response_text.chars().take(500).collect::<String>(),
            "Storage API returned non-success status"
        );

        if status == reqwest::StatusCode::CONFLICT {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        Err(StorageError::Status {
            status: status.as_u16(),
            message: response_text.chars().take(200).collect(),
        })
    }

    fn public_url(&self, key: &str) -> Result<Url, StorageError> {
        validate_key(key)?;
        join_segments(
            &self.inner.base_url,
            &["storage", "v1", "object", "public", &self.inner.bucket, key],
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::media::{MediaError, MediaSettings, MediaUploadCoordinator};

    fn store_at(base: &str) -> HttpObjectStore {
        HttpObjectStore::new(
            Url::parse(base).unwrap(),
            SecretString::from("service-key"),
            "profile_pics",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn store() -> HttpObjectStore {
        store_at("https://project.storage.test")
    }

    #[test]
    fn test_public_url_layout() {
        let url = store().public_url("abc.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.storage.test/storage/v1/object/public/profile_pics/abc.jpg"
        );
    }

    #[test]
    fn test_upload_url_layout() {
        let url = store().object_url("abc.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.storage.test/storage/v1/object/profile_pics/abc.jpg"
        );
    }

    #[test]
    fn test_public_url_rejects_nested_key() {
        assert!(matches!(
            store().public_url("../abc.jpg"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_put_sends_upsert_headers_and_body() {
        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method(Method::POST)
                    .path("/storage/v1/object/profile_pics/abc.jpg")
                    .header("authorization", "Bearer service-key")
                    .header("apikey", "service-key")
                    .header("content-type", "image/jpeg")
                    .header("x-upsert", "true")
                    .header("cache-control", "max-age=0")
                    .body("jpeg-bytes");
                then.status(200).body(r#"{"Key":"profile_pics/abc.jpg"}"#);
            })
            .await;

        store_at(&server.base_url())
            .put(
                "abc.jpg",
                Bytes::from_static(b"jpeg-bytes"),
                &PutOptions::replace_uncached("image/jpeg"),
            )
            .await
            .unwrap();

        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_conflict_is_already_exists() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(Method::POST)
                    .path("/storage/v1/object/profile_pics/abc.jpg")
                    .header("x-upsert", "false");
                then.status(409).body(r#"{"error":"Duplicate"}"#);
            })
            .await;

        let options = PutOptions {
            upsert: false,
            cache_control: None,
            content_type: "image/jpeg".to_string(),
        };
        let err = store_at(&server.base_url())
            .put("abc.jpg", Bytes::from_static(b"x"), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::AlreadyExists(key) if key == "abc.jpg"));
    }

    #[tokio::test]
    async fn test_unavailable_storage_fails_photo_upload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(Method::POST);
                then.status(503).body("upstream unavailable");
            })
            .await;

        let store = Arc::new(store_at(&server.base_url()));
        let coordinator =
            MediaUploadCoordinator::new(store, MediaSettings::default()).unwrap();

        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 80)
            .encode_image(&image::DynamicImage::new_rgb8(32, 32))
            .unwrap();
        let err = coordinator
            .replace_photo(qrtag_core::AccountId::generate(), Bytes::from(jpeg))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MediaError::UploadFailed(StorageError::Status { status: 503, .. })
        ));
    }
}
